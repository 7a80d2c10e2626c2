mod answer;
mod identity;
mod ids;
mod question;
mod quiz;
mod result;
mod settings;

pub use ids::{ParseIdError, QuestionId, QuizId, ResultId, UserId};

pub use answer::AnsweredQuestion;
pub use identity::{Credentials, Identity, IdentityError, Registration, Role};
pub use question::{Difficulty, Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use quiz::{Quiz, QuizDraft, QuizError, QuizRef, ValidatedQuiz};
pub use result::{QuizResult, ResultEntry, ResultError, SyncStatus};
pub use settings::{QuizSettings, SettingsError};
