use thiserror::Error;

use crate::model::{IdentityError, QuestionError, QuizError, ResultError, SettingsError};

/// Any domain validation failure raised while building or rehydrating models.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Result(#[from] ResultError),
}
