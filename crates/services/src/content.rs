use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use quiz_core::model::{
    Identity, Question, QuestionDraft, QuestionId, Quiz, QuizDraft, QuizId,
};
use storage::records::{self, QuestionRecord, QuizRecord};
use storage::repository::{
    Collection, PersistentStore, RemoteDataSource, Storage, StorageError, keys,
};

use crate::Clock;
use crate::error::ContentError;

/// Where the most recent load got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSource {
    Remote,
    /// Remote unreachable; served from the offline cache.
    Cache,
    /// Neither remote data nor cache available; served the configured pool.
    Fallback,
}

/// Questions served when nothing else is available.
#[derive(Debug, Clone, Default)]
pub struct FallbackPool {
    pub questions: Vec<Question>,
    /// Also use the pool when the remote answers with an empty list. Either way
    /// an empty list leaves the offline cache untouched.
    pub when_empty: bool,
}

/// Question and quiz content: loading with offline fallback, queries and admin edits.
pub struct QuestionCatalog {
    clock: Clock,
    remote: Arc<dyn RemoteDataSource>,
    local: Arc<dyn PersistentStore>,
    fallback: FallbackPool,
    questions: RwLock<Vec<Question>>,
    quizzes: RwLock<Vec<Quiz>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn ensure_admin(actor: &Identity) -> Result<(), ContentError> {
    if actor.is_admin() {
        Ok(())
    } else {
        warn!(user_id = %actor.id(), "content change refused for non-admin");
        Err(ContentError::Forbidden)
    }
}

impl QuestionCatalog {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, fallback: FallbackPool) -> Self {
        Self {
            clock,
            remote: Arc::clone(&storage.remote),
            local: Arc::clone(&storage.local),
            fallback,
            questions: RwLock::new(Vec::new()),
            quizzes: RwLock::new(Vec::new()),
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Load the question pool: remote first, then the offline cache, then the
    /// fallback pool.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` if the remote answers with a definite error.
    pub async fn load_questions(&self) -> Result<PoolSource, ContentError> {
        let fetched: Result<Vec<QuestionRecord>, StorageError> =
            records::fetch_all(self.remote.as_ref(), Collection::Questions).await;

        let (questions, source) = match fetched {
            Ok(list) => {
                let questions = decode_questions(list);
                // an empty answer never replaces a cached pool
                if !questions.is_empty() {
                    self.cache_questions(&questions);
                }
                if questions.is_empty() && self.fallback.when_empty {
                    info!("remote question list is empty; using fallback pool");
                    (self.fallback.questions.clone(), PoolSource::Fallback)
                } else {
                    (questions, PoolSource::Remote)
                }
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "questions unavailable; trying offline cache");
                let cached = records::read_local::<Vec<QuestionRecord>>(
                    self.local.as_ref(),
                    keys::OFFLINE_QUESTIONS,
                )
                .unwrap_or_else(|e| {
                    warn!(error = %e, "offline question cache is unreadable");
                    None
                });
                match cached.map(decode_questions) {
                    Some(questions) if !questions.is_empty() => (questions, PoolSource::Cache),
                    _ => {
                        warn!(
                            count = self.fallback.questions.len(),
                            "no cached questions; using fallback pool"
                        );
                        (self.fallback.questions.clone(), PoolSource::Fallback)
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        *write(&self.questions) = questions;
        Ok(source)
    }

    /// Load quizzes from the remote, falling back to the offline cache.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` if the remote answers with a definite error.
    pub async fn load_quizzes(&self) -> Result<PoolSource, ContentError> {
        let fetched: Result<Vec<QuizRecord>, StorageError> =
            records::fetch_all(self.remote.as_ref(), Collection::Quizzes).await;

        let (quizzes, source) = match fetched {
            Ok(list) => {
                if let Err(e) =
                    records::write_local(self.local.as_ref(), keys::OFFLINE_QUIZZES, &list)
                {
                    warn!(error = %e, "could not cache quizzes offline");
                }
                (decode_quizzes(list), PoolSource::Remote)
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "quizzes unavailable; using offline cache");
                let cached = records::read_local::<Vec<QuizRecord>>(
                    self.local.as_ref(),
                    keys::OFFLINE_QUIZZES,
                )
                .unwrap_or_else(|e| {
                    warn!(error = %e, "offline quiz cache is unreadable");
                    None
                });
                match cached {
                    Some(list) => (decode_quizzes(list), PoolSource::Cache),
                    None => (Vec::new(), PoolSource::Fallback),
                }
            }
            Err(e) => return Err(e.into()),
        };

        *write(&self.quizzes) = quizzes;
        Ok(source)
    }

    fn cache_questions(&self, questions: &[Question]) {
        let list: Vec<QuestionRecord> = questions.iter().map(QuestionRecord::from_question).collect();
        if let Err(e) = records::write_local(self.local.as_ref(), keys::OFFLINE_QUESTIONS, &list) {
            warn!(error = %e, "could not cache questions offline");
        }
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn questions(&self) -> Vec<Question> {
        read(&self.questions).clone()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<Question> {
        read(&self.questions).iter().find(|q| q.id() == id).cloned()
    }

    /// Distinct categories in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for q in read(&self.questions).iter() {
            if !categories.iter().any(|c| c == q.category()) {
                categories.push(q.category().to_string());
            }
        }
        categories
    }

    #[must_use]
    pub fn questions_by_category(&self, category: &str) -> Vec<Question> {
        read(&self.questions)
            .iter()
            .filter(|q| q.category() == category)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn quizzes(&self) -> Vec<Quiz> {
        read(&self.quizzes).clone()
    }

    #[must_use]
    pub fn active_quizzes(&self) -> Vec<Quiz> {
        read(&self.quizzes)
            .iter()
            .filter(|q| q.is_active())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn quiz(&self, id: QuizId) -> Option<Quiz> {
        read(&self.quizzes).iter().find(|q| q.id() == id).cloned()
    }

    /// Resolve a quiz's questions in quiz order, preferring the loaded pool and
    /// fetching the rest from the remote.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::QuizNotFound` / `QuestionNotFound` for unknown ids
    /// and `ContentError::Storage` for fetch failures.
    pub async fn quiz_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, ContentError> {
        let quiz = match self.quiz(quiz_id) {
            Some(quiz) => quiz,
            None => records::fetch_one::<QuizRecord>(
                self.remote.as_ref(),
                Collection::Quizzes,
                quiz_id.value(),
            )
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ContentError::QuizNotFound(quiz_id),
                other => other.into(),
            })?
            .into_quiz()?,
        };

        let mut resolved = Vec::with_capacity(quiz.question_ids().len());
        for &id in quiz.question_ids() {
            if let Some(question) = self.question(id) {
                resolved.push(question);
                continue;
            }
            let record: QuestionRecord =
                records::fetch_one(self.remote.as_ref(), Collection::Questions, id.value())
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound => ContentError::QuestionNotFound(id),
                        other => other.into(),
                    })?;
            resolved.push(record.into_question()?);
        }
        Ok(resolved)
    }

    //
    // ─── ADMIN ─────────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins, a validation error for a
    /// bad draft, or `ContentError::Storage` if the write fails.
    pub async fn create_question(
        &self,
        actor: &Identity,
        draft: QuestionDraft,
    ) -> Result<Question, ContentError> {
        ensure_admin(actor)?;
        let validated = draft.validate()?;
        let record = QuestionRecord::new_unsaved(&validated, self.clock.now());
        let stored = records::create(self.remote.as_ref(), Collection::Questions, &record).await?;
        let question = stored.into_question()?;

        info!(question_id = %question.id(), "question created");
        write(&self.questions).push(question.clone());
        self.cache_questions(&self.questions());
        Ok(question)
    }

    /// # Errors
    ///
    /// Same as [`QuestionCatalog::create_question`]; an unknown id surfaces as
    /// `StorageError::NotFound`.
    pub async fn update_question(
        &self,
        actor: &Identity,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<Question, ContentError> {
        ensure_admin(actor)?;
        let record = QuestionRecord::from_question(&draft.validate()?.assign_id(id));
        let stored =
            records::update(self.remote.as_ref(), Collection::Questions, id.value(), &record)
                .await?;
        let question = stored.into_question()?;

        info!(question_id = %id, "question updated");
        {
            let mut questions = write(&self.questions);
            match questions.iter_mut().find(|q| q.id() == id) {
                Some(slot) => *slot = question.clone(),
                None => questions.push(question.clone()),
            }
        }
        self.cache_questions(&self.questions());
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins or `ContentError::Storage`
    /// if the delete fails.
    pub async fn delete_question(&self, actor: &Identity, id: QuestionId) -> Result<(), ContentError> {
        ensure_admin(actor)?;
        self.remote.delete(Collection::Questions, id.value()).await?;
        info!(question_id = %id, "question deleted");
        write(&self.questions).retain(|q| q.id() != id);
        self.cache_questions(&self.questions());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins, a validation error for a
    /// bad draft, or `ContentError::Storage` if the write fails.
    pub async fn create_quiz(&self, actor: &Identity, draft: QuizDraft) -> Result<Quiz, ContentError> {
        ensure_admin(actor)?;
        let validated = draft.validate(self.clock.now())?;
        let record = QuizRecord::new_unsaved(&validated);
        let quiz = records::create(self.remote.as_ref(), Collection::Quizzes, &record)
            .await?
            .into_quiz()?;

        info!(quiz_id = %quiz.id(), "quiz created");
        write(&self.quizzes).push(quiz.clone());
        Ok(quiz)
    }

    /// # Errors
    ///
    /// Same as [`QuestionCatalog::create_quiz`].
    pub async fn update_quiz(
        &self,
        actor: &Identity,
        id: QuizId,
        draft: QuizDraft,
    ) -> Result<Quiz, ContentError> {
        ensure_admin(actor)?;
        let mut record = QuizRecord::from_quiz(&draft.validate(self.clock.now())?.assign_id(id));
        // keep the stored creation time
        record.created_at = None;
        let quiz = records::update(self.remote.as_ref(), Collection::Quizzes, id.value(), &record)
            .await?
            .into_quiz()?;

        info!(quiz_id = %id, "quiz updated");
        let mut quizzes = write(&self.quizzes);
        match quizzes.iter_mut().find(|q| q.id() == id) {
            Some(slot) => *slot = quiz.clone(),
            None => quizzes.push(quiz.clone()),
        }
        Ok(quiz)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins or `ContentError::Storage`
    /// if the delete fails.
    pub async fn delete_quiz(&self, actor: &Identity, id: QuizId) -> Result<(), ContentError> {
        ensure_admin(actor)?;
        self.remote.delete(Collection::Quizzes, id.value()).await?;
        info!(quiz_id = %id, "quiz deleted");
        write(&self.quizzes).retain(|q| q.id() != id);
        Ok(())
    }
}

fn decode_questions(list: Vec<QuestionRecord>) -> Vec<Question> {
    list.into_iter()
        .filter_map(|record| {
            record
                .into_question()
                .map_err(|e| warn!(error = %e, "skipping invalid question"))
                .ok()
        })
        .collect()
}

fn decode_quizzes(list: Vec<QuizRecord>) -> Vec<Quiz> {
    list.into_iter()
        .filter_map(|record| {
            record
                .into_quiz()
                .map_err(|e| warn!(error = %e, "skipping invalid quiz"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Difficulty, Role, UserId};
    use quiz_core::time::fixed_clock;
    use serde_json::json;
    use storage::memory::{InMemoryRemote, MemoryStore};

    fn admin() -> Identity {
        Identity::new(UserId::new(1), "Admin", "admin@quiz.com", Role::Admin)
    }

    fn learner() -> Identity {
        Identity::new(UserId::new(2), "Student", "student@quiz.com", Role::Learner)
    }

    fn draft(prompt: &str, category: &str) -> QuestionDraft {
        QuestionDraft {
            prompt: prompt.into(),
            options: vec!["one".into(), "two".into(), "three".into()],
            correct_index: Some(1),
            category: category.into(),
            difficulty: Difficulty::Medium,
            points: 1,
        }
    }

    fn fallback_question() -> Question {
        draft("Fallback?", "Offline")
            .validate()
            .unwrap()
            .assign_id(QuestionId::new(900))
    }

    fn catalog(remote: &InMemoryRemote, local: &MemoryStore, when_empty: bool) -> QuestionCatalog {
        let storage = Storage::new(Arc::new(remote.clone()), Arc::new(local.clone()));
        QuestionCatalog::new(
            fixed_clock(),
            &storage,
            FallbackPool {
                questions: vec![fallback_question()],
                when_empty,
            },
        )
    }

    async fn seed(remote: &InMemoryRemote) {
        for (id, cat) in [(1, "JavaScript"), (2, "Vue.js"), (3, "JavaScript")] {
            remote
                .create(
                    Collection::Questions,
                    json!({
                        "id": id,
                        "question": format!("Q{id}"),
                        "options": ["a", "b"],
                        "correctAnswer": 0,
                        "category": cat,
                        "difficulty": "easy"
                    }),
                )
                .await
                .unwrap();
        }
        remote
            .create(
                Collection::Quizzes,
                json!({"id": 1, "title": "JS", "questions": [3, 1], "isActive": true}),
            )
            .await
            .unwrap();
        remote
            .create(
                Collection::Quizzes,
                json!({"id": 2, "title": "Draft", "questions": [2], "isActive": false}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn loads_remote_and_answers_queries() {
        let remote = InMemoryRemote::new();
        seed(&remote).await;
        let catalog = catalog(&remote, &MemoryStore::new(), false);

        assert_eq!(catalog.load_questions().await.unwrap(), PoolSource::Remote);
        assert_eq!(catalog.questions().len(), 3);
        assert_eq!(catalog.categories(), ["JavaScript", "Vue.js"]);
        assert_eq!(catalog.questions_by_category("JavaScript").len(), 2);

        catalog.load_quizzes().await.unwrap();
        assert_eq!(catalog.quizzes().len(), 2);
        assert_eq!(catalog.active_quizzes().len(), 1);
        let ids: Vec<_> = catalog
            .quiz_questions(QuizId::new(1))
            .await
            .unwrap()
            .iter()
            .map(Question::id)
            .collect();
        assert_eq!(ids, [QuestionId::new(3), QuestionId::new(1)]);
    }

    #[tokio::test]
    async fn offline_uses_cache_then_fallback() {
        let remote = InMemoryRemote::new();
        let local = MemoryStore::new();
        seed(&remote).await;

        let fresh = catalog(&remote, &MemoryStore::new(), false);
        remote.set_offline(true);
        assert_eq!(fresh.load_questions().await.unwrap(), PoolSource::Fallback);
        assert_eq!(fresh.questions(), vec![fallback_question()]);

        remote.set_offline(false);
        let cached = catalog(&remote, &local, false);
        cached.load_questions().await.unwrap();
        remote.set_offline(true);
        assert_eq!(cached.load_questions().await.unwrap(), PoolSource::Cache);
        assert_eq!(cached.questions().len(), 3);
    }

    #[tokio::test]
    async fn empty_remote_uses_fallback_only_when_configured() {
        let remote = InMemoryRemote::new();
        let strict = catalog(&remote, &MemoryStore::new(), false);
        assert_eq!(strict.load_questions().await.unwrap(), PoolSource::Remote);
        assert!(strict.questions().is_empty());

        let lenient = catalog(&remote, &MemoryStore::new(), true);
        assert_eq!(lenient.load_questions().await.unwrap(), PoolSource::Fallback);
        assert_eq!(lenient.questions().len(), 1);
    }

    #[tokio::test]
    async fn empty_remote_keeps_offline_cache() {
        let remote = InMemoryRemote::new();
        let local = MemoryStore::new();
        seed(&remote).await;
        let catalog = catalog(&remote, &local, false);
        catalog.load_questions().await.unwrap();

        for id in 1..=3 {
            remote.delete(Collection::Questions, id).await.unwrap();
        }
        assert_eq!(catalog.load_questions().await.unwrap(), PoolSource::Remote);
        assert!(catalog.questions().is_empty());

        remote.set_offline(true);
        assert_eq!(catalog.load_questions().await.unwrap(), PoolSource::Cache);
        assert_eq!(catalog.questions().len(), 3);
    }

    #[tokio::test]
    async fn admin_crud_round_trip() {
        let remote = InMemoryRemote::new();
        let catalog = catalog(&remote, &MemoryStore::new(), false);

        let created = catalog
            .create_question(&admin(), draft("What is 1 + 1?", "Math"))
            .await
            .unwrap();
        assert_eq!(created.correct_option(), "two");

        let updated = catalog
            .update_question(&admin(), created.id(), draft("What is 2 - 1?", "Math"))
            .await
            .unwrap();
        assert_eq!(updated.prompt(), "What is 2 - 1?");
        assert_eq!(catalog.question(created.id()).unwrap(), updated);

        let quiz = catalog
            .create_quiz(
                &admin(),
                QuizDraft {
                    title: "Math".into(),
                    question_ids: vec![created.id()],
                    is_active: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let renamed = catalog
            .update_quiz(
                &admin(),
                quiz.id(),
                QuizDraft {
                    title: "Arithmetic".into(),
                    ..quiz.to_draft()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title(), "Arithmetic");
        assert_eq!(renamed.created_at(), quiz.created_at());

        catalog.delete_quiz(&admin(), quiz.id()).await.unwrap();
        catalog.delete_question(&admin(), created.id()).await.unwrap();
        assert!(catalog.questions().is_empty());
        assert_eq!(remote.len(Collection::Questions), 0);
        assert!(matches!(
            catalog.delete_question(&admin(), created.id()).await.unwrap_err(),
            ContentError::Storage(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn non_admins_are_forbidden_and_drafts_validated() {
        let remote = InMemoryRemote::new();
        let catalog = catalog(&remote, &MemoryStore::new(), false);
        assert!(matches!(
            catalog
                .create_question(&learner(), draft("Q", "C"))
                .await
                .unwrap_err(),
            ContentError::Forbidden
        ));
        assert!(matches!(
            catalog.delete_quiz(&learner(), QuizId::new(1)).await.unwrap_err(),
            ContentError::Forbidden
        ));

        let mut bad = draft("Q", "C");
        bad.options.truncate(1);
        assert!(matches!(
            catalog.create_question(&admin(), bad).await.unwrap_err(),
            ContentError::Question(_)
        ));
        assert_eq!(remote.len(Collection::Questions), 0);
    }

    #[tokio::test]
    async fn unknown_quiz_is_reported() {
        let catalog = catalog(&InMemoryRemote::new(), &MemoryStore::new(), false);
        assert!(matches!(
            catalog.quiz_questions(QuizId::new(42)).await.unwrap_err(),
            ContentError::QuizNotFound(_)
        ));
    }
}
