use chrono::{DateTime, Utc};

use crate::model::ids::QuestionId;
use crate::model::question::Question;

/// A learner's committed choice for one question.
///
/// Correctness is derived from the question at the moment of answering and is
/// never recomputed against later edits to that question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredQuestion {
    question_id: QuestionId,
    answer_index: usize,
    is_correct: bool,
    answered_at: DateTime<Utc>,
}

impl AnsweredQuestion {
    /// Records `option_index` against `question`.
    ///
    /// Returns `None` when the index does not address one of the question's options.
    #[must_use]
    pub fn record(
        question: &Question,
        option_index: usize,
        answered_at: DateTime<Utc>,
    ) -> Option<Self> {
        if option_index >= question.options().len() {
            return None;
        }
        Some(Self {
            question_id: question.id(),
            answer_index: option_index,
            is_correct: question.is_correct(option_index),
            answered_at,
        })
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn answer_index(&self) -> usize {
        self.answer_index
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use crate::time::fixed_now;

    fn question() -> Question {
        Question::from_persisted(
            QuestionId::new(5),
            "2 + 2?",
            vec!["3".into(), "4".into()],
            1,
            "Math",
            Difficulty::Easy,
            1,
        )
        .unwrap()
    }

    #[test]
    fn records_correctness() {
        let q = question();
        let right = AnsweredQuestion::record(&q, 1, fixed_now()).unwrap();
        assert!(right.is_correct());
        assert_eq!(right.question_id(), QuestionId::new(5));

        let wrong = AnsweredQuestion::record(&q, 0, fixed_now()).unwrap();
        assert!(!wrong.is_correct());
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(AnsweredQuestion::record(&question(), 2, fixed_now()).is_none());
    }
}
