//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{
    IdentityError, QuestionError, QuestionId, QuizError, QuizId, ResultError, SettingsError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionState;

/// Errors emitted by `QuizSession` and `QuizRunner`.
///
/// Every variant leaves the session exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {op} while session is {state}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },
    #[error("option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("no questions available for session")]
    Empty,
    #[error("question {0} appears more than once in the pool")]
    DuplicateQuestion(QuestionId),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Errors emitted by `ResultsLedger`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("only a completed session can be committed")]
    NotCompleted,
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] IdentityError),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionCatalog`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("content changes require an admin")]
    Forbidden,
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading `AppConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} is not a valid number: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} is not a valid flag: {value}")]
    InvalidFlag { key: &'static str, value: String },
    #[error("{key} is not a valid url: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
