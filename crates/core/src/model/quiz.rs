use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("a quiz needs at least one question")]
    NoQuestions,

    #[error("question {0} is listed more than once")]
    DuplicateQuestion(QuestionId),

    #[error("time limit must be > 0 when set")]
    ZeroTimeLimit,
}

/// Unvalidated quiz input from the content editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuizDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub question_ids: Vec<QuestionId>,
    pub time_limit_secs: Option<u32>,
    pub is_active: bool,
}

impl QuizDraft {
    /// Validate and stamp the draft with a creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for an empty title, an empty or duplicated question list,
    /// or a zero time limit.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuiz, QuizError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.question_ids.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        for (i, id) in self.question_ids.iter().enumerate() {
            if self.question_ids[..i].contains(id) {
                return Err(QuizError::DuplicateQuestion(*id));
            }
        }
        if self.time_limit_secs == Some(0) {
            return Err(QuizError::ZeroTimeLimit);
        }
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(ValidatedQuiz {
            title,
            description,
            category: self.category.trim().to_string(),
            question_ids: self.question_ids,
            time_limit_secs: self.time_limit_secs,
            is_active: self.is_active,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    title: String,
    description: Option<String>,
    category: String,
    question_ids: Vec<QuestionId>,
    time_limit_secs: Option<u32>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl ValidatedQuiz {
    /// Draft view of the validated (normalized) content.
    #[must_use]
    pub fn to_draft(&self) -> QuizDraft {
        QuizDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            question_ids: self.question_ids.clone(),
            time_limit_secs: self.time_limit_secs,
            is_active: self.is_active,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn assign_id(self, id: QuizId) -> Quiz {
        Quiz {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            question_ids: self.question_ids,
            time_limit_secs: self.time_limit_secs,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// A named, ordered selection of questions offered to learners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: Option<String>,
    category: String,
    question_ids: Vec<QuestionId>,
    time_limit_secs: Option<u32>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Rehydrate a quiz from persisted fields.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the stored fields violate quiz invariants.
    pub fn from_persisted(
        id: QuizId,
        draft: QuizDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        Ok(draft.validate(created_at)?.assign_id(id))
    }

    #[must_use]
    pub fn to_draft(&self) -> QuizDraft {
        QuizDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            question_ids: self.question_ids.clone(),
            time_limit_secs: self.time_limit_secs,
            is_active: self.is_active,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Lightweight reference to the quiz a session was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRef {
    pub id: QuizId,
    pub title: String,
}

impl From<&Quiz> for QuizRef {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id(),
            title: quiz.title().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuizDraft {
        QuizDraft {
            title: " JavaScript basics ".into(),
            description: Some("   ".into()),
            category: "JavaScript".into(),
            question_ids: vec![QuestionId::new(1), QuestionId::new(2)],
            time_limit_secs: Some(120),
            is_active: true,
        }
    }

    #[test]
    fn validates_and_normalizes() {
        let quiz = draft().validate(fixed_now()).unwrap().assign_id(QuizId::new(3));
        assert_eq!(quiz.title(), "JavaScript basics");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.question_ids().len(), 2);
        assert_eq!(quiz.created_at(), fixed_now());
        assert_eq!(QuizRef::from(&quiz).title, "JavaScript basics");
    }

    #[test]
    fn rejects_duplicates_and_empty_lists() {
        let mut d = draft();
        d.question_ids.push(QuestionId::new(1));
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuizError::DuplicateQuestion(QuestionId::new(1))
        );

        let mut d = draft();
        d.question_ids.clear();
        assert_eq!(d.validate(fixed_now()).unwrap_err(), QuizError::NoQuestions);
    }

    #[test]
    fn rejects_blank_title_and_zero_limit() {
        let mut d = draft();
        d.title = " ".into();
        assert_eq!(d.validate(fixed_now()).unwrap_err(), QuizError::EmptyTitle);

        let mut d = draft();
        d.time_limit_secs = Some(0);
        assert_eq!(d.validate(fixed_now()).unwrap_err(), QuizError::ZeroTimeLimit);
    }
}
