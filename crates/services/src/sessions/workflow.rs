use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use quiz_core::model::{AnsweredQuestion, Identity, Question, Quiz, QuizResult, QuizSettings};

use super::progress::SessionProgress;
use super::quiz_session::QuizSession;
use super::state::SessionState;
use crate::Clock;
use crate::error::{LedgerError, SessionError};
use crate::results::ResultsLedger;
use crate::timer::QuizTimer;

fn lock(session: &Mutex<QuizSession>) -> MutexGuard<'_, QuizSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one session at a time against a countdown.
///
/// Timer expiry auto-completes the session it was started for; a session that was
/// reset or replaced in the meantime is left alone.
pub struct QuizRunner {
    settings: QuizSettings,
    session: Arc<Mutex<QuizSession>>,
    timer: QuizTimer,
}

impl QuizRunner {
    #[must_use]
    pub fn new(clock: Clock, settings: QuizSettings) -> Self {
        Self {
            settings,
            session: Arc::new(Mutex::new(QuizSession::new(clock))),
            timer: QuizTimer::new(),
        }
    }

    /// Reset, load and start a fresh session, then start its countdown.
    ///
    /// The countdown uses the quiz time limit when one is set, otherwise the
    /// configured limit; zero means untimed. Returns the session generation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the pool is invalid or yields no questions. The
    /// runner is left idle in that case.
    ///
    /// # Panics
    ///
    /// Panics if a timed session is started outside a Tokio runtime.
    pub fn begin(&mut self, pool: Vec<Question>, quiz: Option<&Quiz>) -> Result<u64, SessionError> {
        self.timer.reset();
        let count = usize::try_from(self.settings.question_count()).unwrap_or(usize::MAX);
        let generation = {
            let mut session = lock(&self.session);
            session.reset();
            let started = match quiz {
                Some(quiz) => session.load_quiz(quiz, pool),
                None => session.load_pool(pool),
            }
            .and_then(|()| session.start(count));
            if started.is_err() {
                session.reset();
            }
            started?
        };

        let limit = quiz
            .and_then(Quiz::time_limit_secs)
            .unwrap_or(self.settings.time_limit_secs());
        let session = Arc::clone(&self.session);
        self.timer.start(limit, move || {
            if lock(&session).auto_complete_for(generation) {
                info!(generation, "time is up; session completed");
            }
        });
        Ok(generation)
    }

    /// # Errors
    ///
    /// See [`QuizSession::submit_answer`].
    pub fn answer(&self, option_index: usize) -> Result<AnsweredQuestion, SessionError> {
        lock(&self.session).submit_answer(option_index).cloned()
    }

    /// Advance; stops the countdown once the session completes.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::advance`].
    pub fn next(&mut self) -> Result<SessionState, SessionError> {
        let state = lock(&self.session).advance()?;
        if state == SessionState::Completed {
            self.timer.stop();
        }
        Ok(state)
    }

    /// # Errors
    ///
    /// See [`QuizSession::retreat`].
    pub fn previous(&self) -> Result<(), SessionError> {
        lock(&self.session).retreat()
    }

    /// Commit the completed session to `ledger`.
    ///
    /// Time spent is the countdown's elapsed time, or the wall-clock duration of
    /// an untimed session.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotCompleted` while the session is still running.
    pub async fn finish(
        &mut self,
        ledger: &ResultsLedger,
        identity: &Identity,
    ) -> Result<QuizResult, LedgerError> {
        let session = lock(&self.session).clone();
        if !session.is_completed() {
            return Err(LedgerError::NotCompleted);
        }
        self.timer.stop();
        let time_spent = if self.timer.duration() > 0 {
            self.timer.elapsed()
        } else {
            session.elapsed_secs()
        };
        ledger.commit(&session, identity, time_spent).await
    }

    /// Drop the current session and its countdown.
    pub fn abandon(&mut self) {
        self.timer.reset();
        lock(&self.session).reset();
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    #[must_use]
    pub fn timer(&self) -> &QuizTimer {
        &self.timer
    }

    /// Copy of the session as it is right now.
    #[must_use]
    pub fn session(&self) -> QuizSession {
        lock(&self.session).clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        lock(&self.session).current_question().cloned()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        lock(&self.session).progress()
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        lock(&self.session).score()
    }
}
