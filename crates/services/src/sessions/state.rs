use serde::Serialize;
use std::fmt;

/// Lifecycle of a quiz session. `Completed` is terminal until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No pool loaded.
    #[default]
    Idle,
    /// Pool loaded, not started.
    Ready,
    /// Questions selected and being answered.
    Active,
    Completed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Ready => "ready",
            SessionState::Active => "active",
            SessionState::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
