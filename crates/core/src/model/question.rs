use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least 2 options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct answer must be selected")]
    MissingCorrectAnswer,

    #[error("correct answer index {index} is out of range for {len} options")]
    CorrectAnswerOutOfRange { index: usize, len: usize },

    #[error("category cannot be empty")]
    EmptyCategory,

    #[error("point value must be > 0")]
    ZeroPoints,

    #[error("option order is not a permutation of {len} options")]
    InvalidPermutation { len: usize },

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(QuestionError::UnknownDifficulty(other.to_string())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as submitted by the content editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
    pub category: String,
    pub difficulty: Difficulty,
    pub points: u32,
}

impl QuestionDraft {
    /// Validate the draft into question content without an id yet.
    ///
    /// Prompt and category are trimmed; options keep their text but must not be blank.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        check_options(&self.options)?;
        let correct_index = self.correct_index.ok_or(QuestionError::MissingCorrectAnswer)?;
        if correct_index >= self.options.len() {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                index: correct_index,
                len: self.options.len(),
            });
        }
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }
        if self.points == 0 {
            return Err(QuestionError::ZeroPoints);
        }

        Ok(ValidatedQuestion {
            prompt,
            options: self.options,
            correct_index,
            category,
            difficulty: self.difficulty,
            points: self.points,
        })
    }
}

fn check_options(options: &[String]) -> Result<(), QuestionError> {
    if options.len() < 2 {
        return Err(QuestionError::TooFewOptions { len: options.len() });
    }
    if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
        return Err(QuestionError::EmptyOption { index });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    category: String,
    difficulty: Difficulty,
    points: u32,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            prompt: self.prompt,
            options: self.options,
            correct_index: self.correct_index,
            category: self.category,
            difficulty: self.difficulty,
            points: self.points,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question. Content never changes once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    category: String,
    difficulty: Difficulty,
    points: u32,
}

impl Question {
    /// Rehydrate a question from persisted fields.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored fields violate question invariants.
    pub fn from_persisted(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        category: impl Into<String>,
        difficulty: Difficulty,
        points: u32,
    ) -> Result<Self, QuestionError> {
        let validated = QuestionDraft {
            prompt: prompt.into(),
            options,
            correct_index: Some(correct_index),
            category: category.into(),
            difficulty,
            points,
        }
        .validate()?;
        Ok(validated.assign_id(id))
    }

    /// Returns a copy whose options are reordered so that new slot `i` holds the
    /// option previously at `order[i]`. The correct index follows its option.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidPermutation` unless `order` is a permutation
    /// of `0..options.len()`.
    pub fn permute_options(&self, order: &[usize]) -> Result<Self, QuestionError> {
        let len = self.options.len();
        let mut seen = vec![false; len];
        for &from in order {
            match seen.get_mut(from) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(QuestionError::InvalidPermutation { len }),
            }
        }
        if order.len() != len {
            return Err(QuestionError::InvalidPermutation { len });
        }

        let options = order.iter().map(|&from| self.options[from].clone()).collect();
        let correct_index = order
            .iter()
            .position(|&from| from == self.correct_index)
            .ok_or(QuestionError::InvalidPermutation { len })?;

        Ok(Self {
            options,
            correct_index,
            ..self.clone()
        })
    }

    /// Returns a draft pre-filled with this question's content, for editing.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            correct_index: Some(self.correct_index),
            category: self.category.clone(),
            difficulty: self.difficulty,
            points: self.points,
        }
    }

    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
