mod progress;
mod quiz_session;
mod shuffle;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use quiz_session::QuizSession;
pub use state::SessionState;
pub use workflow::QuizRunner;
