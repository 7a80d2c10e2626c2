use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per session must be > 0")]
    InvalidQuestionCount,

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u32),
}

/// Session-level tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    question_count: u32,
    time_limit_secs: u32,
    passing_score: u8,
}

impl QuizSettings {
    pub const DEFAULT_QUESTION_COUNT: u32 = 5;
    pub const DEFAULT_TIME_LIMIT_SECS: u32 = 300;
    pub const DEFAULT_PASSING_SCORE: u8 = 60;

    /// Build validated settings. A `time_limit_secs` of zero means untimed.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a zero question count or a passing score above 100.
    pub fn new(
        question_count: u32,
        time_limit_secs: u32,
        passing_score: u32,
    ) -> Result<Self, SettingsError> {
        if question_count == 0 {
            return Err(SettingsError::InvalidQuestionCount);
        }
        let passing_score = u8::try_from(passing_score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(SettingsError::InvalidPassingScore(passing_score))?;

        Ok(Self {
            question_count,
            time_limit_secs,
            passing_score,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_secs > 0
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn is_passing(&self, score: u8) -> bool {
        score >= self.passing_score
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: Self::DEFAULT_QUESTION_COUNT,
            time_limit_secs: Self::DEFAULT_TIME_LIMIT_SECS,
            passing_score: Self::DEFAULT_PASSING_SCORE,
        }
    }
}
