use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};

use quiz_core::model::{AnsweredQuestion, Question, Quiz, QuizRef, ResultEntry, ResultError};
use quiz_core::scoring;
use quiz_core::time::elapsed_secs;

use super::progress::SessionProgress;
use super::shuffle::permutation;
use super::state::SessionState;
use crate::Clock;
use crate::error::SessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz attempt: pool loading, random selection, answer capture and scoring.
///
/// Every operation either succeeds or returns a `SessionError` without touching
/// the session. The selection is fixed at `start`; answers are kept per position
/// and may be overwritten until the session completes.
#[derive(Debug, Clone)]
pub struct QuizSession {
    clock: Clock,
    state: SessionState,
    pool: Vec<Question>,
    quiz: Option<QuizRef>,
    questions: Vec<Question>,
    position: usize,
    answers: BTreeMap<usize, AnsweredQuestion>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl QuizSession {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            state: SessionState::Idle,
            pool: Vec::new(),
            quiz: None,
            questions: Vec::new(),
            position: 0,
            answers: BTreeMap::new(),
            started_at: None,
            completed_at: None,
            generation: 0,
        }
    }

    fn require(&self, op: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    /// Replace the question pool.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` once a session is active or completed,
    /// and `SessionError::DuplicateQuestion` if two questions share an id.
    pub fn load_pool(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        self.require("load a pool", &[SessionState::Idle, SessionState::Ready])?;
        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id())) {
            return Err(SessionError::DuplicateQuestion(dup.id()));
        }

        self.pool = questions;
        self.quiz = None;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Load the pool for a specific quiz; the quiz reference ends up in the result.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::load_pool`].
    pub fn load_quiz(&mut self, quiz: &Quiz, questions: Vec<Question>) -> Result<(), SessionError> {
        self.load_pool(questions)?;
        self.quiz = Some(QuizRef::from(quiz));
        Ok(())
    }

    /// Start with a random selection of up to `count` questions.
    ///
    /// Returns the generation of the started session.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::start_with_rng`].
    pub fn start(&mut self, count: usize) -> Result<u64, SessionError> {
        self.start_with_rng(count, &mut rand::rng())
    }

    /// Start using the given random source for question and option order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is `Ready`, and
    /// `SessionError::Empty` if the selection would contain no questions.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<u64, SessionError> {
        self.require("start", &[SessionState::Ready])?;
        let take = count.min(self.pool.len());
        if take == 0 {
            return Err(SessionError::Empty);
        }

        let order = permutation(self.pool.len(), rng);
        let mut selected = Vec::with_capacity(take);
        for &index in order.iter().take(take) {
            let question = &self.pool[index];
            let option_order = permutation(question.options().len(), rng);
            selected.push(question.permute_options(&option_order)?);
        }

        self.questions = selected;
        self.position = 0;
        self.answers.clear();
        self.started_at = Some(self.clock.now());
        self.completed_at = None;
        self.generation += 1;
        self.state = SessionState::Active;
        Ok(self.generation)
    }

    /// Record (or overwrite) the answer for the current question. Does not advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless active, and
    /// `SessionError::OptionOutOfRange` for an index past the option list.
    pub fn submit_answer(&mut self, option_index: usize) -> Result<&AnsweredQuestion, SessionError> {
        self.require("submit an answer", &[SessionState::Active])?;
        let question = self
            .questions
            .get(self.position)
            .ok_or(SessionError::Empty)?;
        let answer = AnsweredQuestion::record(question, option_index, self.clock.now()).ok_or(
            SessionError::OptionOutOfRange {
                index: option_index,
                len: question.options().len(),
            },
        )?;

        self.answers.insert(self.position, answer);
        Ok(&self.answers[&self.position])
    }

    /// Move to the next question, completing the session from the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless active.
    pub fn advance(&mut self) -> Result<SessionState, SessionError> {
        self.require("advance", &[SessionState::Active])?;
        if self.position + 1 < self.questions.len() {
            self.position += 1;
        } else {
            self.complete();
        }
        Ok(self.state)
    }

    /// Move back one question; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless active.
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        self.require("go back", &[SessionState::Active])?;
        self.position = self.position.saturating_sub(1);
        Ok(())
    }

    /// Complete an active session, e.g. when time runs out. Returns whether
    /// anything changed.
    pub fn auto_complete(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        self.complete();
        true
    }

    /// Like [`QuizSession::auto_complete`], but ignored unless `generation` is the
    /// currently started session.
    pub fn auto_complete_for(&mut self, generation: u64) -> bool {
        generation == self.generation && self.auto_complete()
    }

    /// Return to `Idle`, dropping pool, selection and answers.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.pool.clear();
        self.quiz = None;
        self.questions.clear();
        self.position = 0;
        self.answers.clear();
        self.started_at = None;
        self.completed_at = None;
        self.generation += 1;
    }

    fn complete(&mut self) {
        self.state = SessionState::Completed;
        self.completed_at = Some(self.clock.now());
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Replace the clock; a fixed clock can be advanced between calls in tests.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    #[must_use]
    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizRef> {
        self.quiz.as_ref()
    }

    /// The selected questions, with options in presentation order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Active | SessionState::Completed => self.questions.get(self.position),
            SessionState::Idle | SessionState::Ready => None,
        }
    }

    #[must_use]
    pub fn answer_at(&self, position: usize) -> Option<&AnsweredQuestion> {
        self.answers.get(&position)
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&AnsweredQuestion> {
        self.answer_at(self.position)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_correct()).count()
    }

    /// Live score over the whole selection; unanswered questions count as wrong.
    #[must_use]
    pub fn score(&self) -> u8 {
        scoring::percentage(self.correct_count(), self.questions.len())
    }

    /// The score, once the session is completed.
    #[must_use]
    pub fn final_score(&self) -> Option<u8> {
        self.is_completed().then(|| self.score())
    }

    #[must_use]
    pub fn is_passed(&self, passing_score: u8) -> bool {
        self.final_score().is_some_and(|s| s >= passing_score)
    }

    /// `100 * (position + 1) / length`, or 0 without a selection.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.questions.is_empty() {
            return 0;
        }
        scoring::percentage(self.position + 1, self.questions.len())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            state: self.state,
            total: self.questions.len(),
            position: self.position,
            answered: self.answered_count(),
            correct: self.correct_count(),
            percent: self.progress_percent(),
        }
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Wall-clock seconds from start to completion (or to now while active).
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        match self.started_at {
            Some(start) => elapsed_secs(start, self.completed_at.unwrap_or_else(|| self.clock.now())),
            None => 0,
        }
    }

    /// Frozen copy of every presented question with its answer, in order.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if an answer does not belong to its question.
    pub fn snapshot(&self) -> Result<Vec<ResultEntry>, ResultError> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| ResultEntry::new(q.clone(), self.answers.get(&i).cloned()))
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
