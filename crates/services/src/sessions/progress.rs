use serde::Serialize;

use super::state::SessionState;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub state: SessionState,
    pub total: usize,
    pub position: usize,
    pub answered: usize,
    pub correct: usize,
    pub percent: u8,
}
