use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::answer::AnsweredQuestion;
use crate::model::identity::Identity;
use crate::model::ids::{ResultId, UserId};
use crate::model::question::Question;
use crate::model::quiz::QuizRef;
use crate::scoring;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("a result needs at least one question")]
    Empty,

    #[error("too many questions for a single result: {len}")]
    TooManyQuestions { len: usize },

    #[error("answer for question {answered} recorded against question {expected}")]
    AnswerMismatch { expected: u64, answered: u64 },

    #[error("answer index {index} is out of range for question {question}")]
    AnswerOutOfRange { question: u64, index: usize },

    #[error("{field} is {actual}, expected {expected}")]
    CountMismatch {
        field: &'static str,
        expected: u32,
        actual: u32,
    },
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Durability of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Stored by the remote data source.
    Synced,
    /// Held locally until a remote write succeeds.
    PendingSync,
}

/// One presented question, frozen as shown, with the learner's answer if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    question: Question,
    answer: Option<AnsweredQuestion>,
}

impl ResultEntry {
    /// # Errors
    ///
    /// Returns `ResultError::AnswerMismatch` if the answer belongs to another question.
    pub fn new(question: Question, answer: Option<AnsweredQuestion>) -> Result<Self, ResultError> {
        if let Some(a) = &answer {
            if a.question_id() != question.id() {
                return Err(ResultError::AnswerMismatch {
                    expected: question.id().value(),
                    answered: a.question_id().value(),
                });
            }
        }
        Ok(Self { question, answer })
    }

    /// Rebuild an entry from stored fields, recomputing correctness against the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::AnswerOutOfRange` if the stored index is not a valid option.
    pub fn from_persisted(
        question: Question,
        answer_index: Option<usize>,
        answered_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        let answer = match answer_index {
            Some(index) => Some(AnsweredQuestion::record(&question, index, answered_at).ok_or(
                ResultError::AnswerOutOfRange {
                    question: question.id().value(),
                    index,
                },
            )?),
            None => None,
        };
        Ok(Self { question, answer })
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> Option<&AnsweredQuestion> {
        self.answer.as_ref()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.answer.as_ref().is_some_and(AnsweredQuestion::is_correct)
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Immutable outcome of one completed quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    id: Option<ResultId>,
    local_id: Uuid,
    owner: UserId,
    owner_name: String,
    quiz: Option<QuizRef>,
    score: u8,
    correct_count: u32,
    total_questions: u32,
    time_spent_secs: u32,
    entries: Vec<ResultEntry>,
    completed_at: DateTime<Utc>,
    sync: SyncStatus,
}

impl QuizResult {
    /// Build a fresh result from a session snapshot. Starts as `PendingSync`
    /// with a new local id until the remote store acknowledges it.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::Empty` for an empty snapshot.
    pub fn from_entries(
        owner: &Identity,
        quiz: Option<QuizRef>,
        entries: Vec<ResultEntry>,
        time_spent_secs: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        if entries.is_empty() {
            return Err(ResultError::Empty);
        }
        let total = entries.len();
        let correct = entries.iter().filter(|e| e.is_correct()).count();
        let total_questions =
            u32::try_from(total).map_err(|_| ResultError::TooManyQuestions { len: total })?;
        let correct_count =
            u32::try_from(correct).map_err(|_| ResultError::TooManyQuestions { len: total })?;

        Ok(Self {
            id: None,
            local_id: Uuid::new_v4(),
            owner: owner.id(),
            owner_name: owner.name().to_string(),
            quiz,
            score: scoring::percentage(correct, total),
            correct_count,
            total_questions,
            time_spent_secs,
            entries,
            completed_at,
            sync: SyncStatus::PendingSync,
        })
    }

    /// Rehydrate a stored result, checking the stored counters against the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::CountMismatch` if score or counts disagree with the entries.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: Option<ResultId>,
        local_id: Uuid,
        owner: UserId,
        owner_name: String,
        quiz: Option<QuizRef>,
        score: u8,
        correct_count: u32,
        total_questions: u32,
        time_spent_secs: u32,
        entries: Vec<ResultEntry>,
        completed_at: DateTime<Utc>,
        sync: SyncStatus,
    ) -> Result<Self, ResultError> {
        if entries.is_empty() {
            return Err(ResultError::Empty);
        }
        let len = entries.len();
        let actual_total =
            u32::try_from(len).map_err(|_| ResultError::TooManyQuestions { len })?;
        check_count("totalQuestions", actual_total, total_questions)?;

        let correct = entries.iter().filter(|e| e.is_correct()).count();
        let actual_correct =
            u32::try_from(correct).map_err(|_| ResultError::TooManyQuestions { len })?;
        check_count("correctAnswers", actual_correct, correct_count)?;
        check_count(
            "score",
            u32::from(scoring::percentage(correct, len)),
            u32::from(score),
        )?;

        Ok(Self {
            id,
            local_id,
            owner,
            owner_name,
            quiz,
            score,
            correct_count,
            total_questions,
            time_spent_secs,
            entries,
            completed_at,
            sync,
        })
    }

    /// Marks the result as stored remotely under `id`.
    pub fn mark_synced(&mut self, id: ResultId) {
        self.id = Some(id);
        self.sync = SyncStatus::Synced;
    }

    #[must_use]
    pub fn id(&self) -> Option<ResultId> {
        self.id
    }

    #[must_use]
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizRef> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn sync(&self) -> SyncStatus {
        self.sync
    }

    #[must_use]
    pub fn is_pending_sync(&self) -> bool {
        self.sync == SyncStatus::PendingSync
    }
}

fn check_count(field: &'static str, expected: u32, actual: u32) -> Result<(), ResultError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ResultError::CountMismatch {
            field,
            expected,
            actual,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
