//! Wire shapes for remote documents and local cache entries.
//!
//! Field names are camelCase to match the JSON data set served to the browser
//! client. Records convert to and from domain types so storage concerns stay out
//! of `quiz-core`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use quiz_core::model::{
    Difficulty, Identity, Question, QuestionId, Quiz, QuizDraft, QuizId, QuizRef, QuizResult,
    ResultEntry, ResultId, Role, SyncStatus, UserId, ValidatedQuestion, ValidatedQuiz,
};

use crate::repository::{Collection, PersistentStore, RemoteDataSource, StorageError};

fn default_points() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_learner() -> Role {
    Role::Learner
}

fn default_synced() -> SyncStatus {
    SyncStatus::Synced
}

fn missing_id(collection: Collection) -> StorageError {
    StorageError::Serialization(format!("{collection} record is missing an id"))
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: Some(question.id().value()),
            question: question.prompt().to_string(),
            options: question.options().to_vec(),
            correct_answer: question.correct_index(),
            category: question.category().to_string(),
            difficulty: question.difficulty(),
            points: question.points(),
            created_at: None,
        }
    }

    /// Record for content that has not been stored yet.
    #[must_use]
    pub fn new_unsaved(question: &ValidatedQuestion, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            question: question.prompt().to_string(),
            options: question.options().to_vec(),
            correct_answer: question.correct_index(),
            category: question.category().to_string(),
            difficulty: question.difficulty(),
            points: question.points(),
            created_at: Some(created_at),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the id is missing or the content violates question
    /// invariants.
    pub fn into_question(self) -> Result<Question, StorageError> {
        let id = self.id.ok_or_else(|| missing_id(Collection::Questions))?;
        Question::from_persisted(
            QuestionId::new(id),
            self.question,
            self.options,
            self.correct_answer,
            self.category,
            self.difficulty,
            self.points,
        )
        .map_err(|e| StorageError::Invalid(e.into()))
    }
}

//
// ─── QUIZZES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    pub questions: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QuizRecord {
    #[must_use]
    pub fn from_quiz(quiz: &Quiz) -> Self {
        let mut record = Self::from_draft(&quiz.to_draft(), quiz.created_at());
        record.id = Some(quiz.id().value());
        record
    }

    #[must_use]
    pub fn new_unsaved(quiz: &ValidatedQuiz) -> Self {
        Self::from_draft(&quiz.to_draft(), quiz.created_at())
    }

    fn from_draft(draft: &QuizDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            questions: draft.question_ids.iter().map(QuestionId::value).collect(),
            time_limit: draft.time_limit_secs,
            is_active: draft.is_active,
            created_at: Some(created_at),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the id is missing or the quiz is invalid.
    pub fn into_quiz(self) -> Result<Quiz, StorageError> {
        let id = self.id.ok_or_else(|| missing_id(Collection::Quizzes))?;
        let draft = QuizDraft {
            title: self.title,
            description: self.description,
            category: self.category,
            question_ids: self.questions.into_iter().map(QuestionId::new).collect(),
            time_limit_secs: self.time_limit,
            is_active: self.is_active,
        };
        Quiz::from_persisted(QuizId::new(id), draft, self.created_at.unwrap_or_default())
            .map_err(|e| StorageError::Invalid(e.into()))
    }
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// A user document. The password is only ever present on records read from or
/// written to the `users` collection, never in the local identity cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_learner")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: Some(identity.id().value()),
            name: identity.name().to_string(),
            email: identity.email().to_string(),
            password: None,
            role: identity.role(),
            created_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the record has no id.
    pub fn into_identity(self) -> Result<Identity, StorageError> {
        let id = self.id.ok_or_else(|| missing_id(Collection::Users))?;
        Ok(Identity::new(UserId::new(id), self.name, self.email, self.role))
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntryRecord {
    pub question: QuestionRecord,
    #[serde(default)]
    pub answer_index: Option<usize>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl ResultEntryRecord {
    #[must_use]
    pub fn from_entry(entry: &ResultEntry) -> Self {
        Self {
            question: QuestionRecord::from_question(entry.question()),
            answer_index: entry.answer().map(|a| a.answer_index()),
            is_correct: entry.is_correct(),
            answered_at: entry.answer().map(|a| a.answered_at()),
        }
    }

    fn into_entry(self, fallback_at: DateTime<Utc>) -> Result<ResultEntry, StorageError> {
        let question = self.question.into_question()?;
        ResultEntry::from_persisted(
            question,
            self.answer_index,
            self.answered_at.unwrap_or(fallback_at),
        )
        .map_err(|e| StorageError::Invalid(e.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub local_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,
    pub user_id: u64,
    pub user_name: String,
    pub score: u8,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub time_spent: u32,
    pub answers: Vec<ResultEntryRecord>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default = "default_synced")]
    pub sync_status: SyncStatus,
}

impl ResultRecord {
    #[must_use]
    pub fn from_result(result: &QuizResult) -> Self {
        Self {
            id: result.id().map(|id| id.value()),
            local_id: result.local_id(),
            quiz_id: result.quiz().map(|q| q.id.value()),
            quiz_title: result.quiz().map(|q| q.title.clone()),
            user_id: result.owner().value(),
            user_name: result.owner_name().to_string(),
            score: result.score(),
            correct_answers: result.correct_count(),
            total_questions: result.total_questions(),
            time_spent: result.time_spent_secs(),
            answers: result.entries().iter().map(ResultEntryRecord::from_entry).collect(),
            submitted_at: result.completed_at(),
            sync_status: result.sync(),
        }
    }

    #[must_use]
    pub fn with_sync_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot or its counters are inconsistent.
    pub fn into_result(self) -> Result<QuizResult, StorageError> {
        let submitted_at = self.submitted_at;
        let entries = self
            .answers
            .into_iter()
            .map(|entry| entry.into_entry(submitted_at))
            .collect::<Result<Vec<_>, _>>()?;
        let quiz = match (self.quiz_id, self.quiz_title) {
            (Some(id), title) => Some(QuizRef {
                id: QuizId::new(id),
                title: title.unwrap_or_default(),
            }),
            (None, _) => None,
        };

        QuizResult::from_persisted(
            self.id.map(ResultId::new),
            self.local_id,
            UserId::new(self.user_id),
            self.user_name,
            quiz,
            self.score,
            self.correct_answers,
            self.total_questions,
            self.time_spent,
            entries,
            submitted_at,
            self.sync_status,
        )
        .map_err(|e| StorageError::Invalid(e.into()))
    }
}

//
// ─── TYPED ACCESS ──────────────────────────────────────────────────────────────
//

/// Fetch and decode every document in `collection`.
///
/// # Errors
///
/// Returns `StorageError` if the fetch fails or a document cannot be decoded.
pub async fn fetch_all<T: DeserializeOwned>(
    remote: &dyn RemoteDataSource,
    collection: Collection,
) -> Result<Vec<T>, StorageError> {
    remote
        .list(collection)
        .await?
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(StorageError::from))
        .collect()
}

/// Fetch and decode a single document.
///
/// # Errors
///
/// Returns `StorageError::NotFound` for a missing id, or a decode error.
pub async fn fetch_one<T: DeserializeOwned>(
    remote: &dyn RemoteDataSource,
    collection: Collection,
    id: u64,
) -> Result<T, StorageError> {
    let doc = remote.get(collection, id).await?;
    Ok(serde_json::from_value(doc)?)
}

/// Encode `record`, create it remotely and decode the stored copy.
///
/// # Errors
///
/// Returns `StorageError` if encoding, the write or decoding fails.
pub async fn create<T: Serialize + DeserializeOwned>(
    remote: &dyn RemoteDataSource,
    collection: Collection,
    record: &T,
) -> Result<T, StorageError> {
    let stored = remote
        .create(collection, serde_json::to_value(record)?)
        .await?;
    Ok(serde_json::from_value(stored)?)
}

/// Encode `record` as a patch for `id` and decode the merged copy.
///
/// # Errors
///
/// Returns `StorageError` if encoding, the write or decoding fails.
pub async fn update<T: Serialize + DeserializeOwned>(
    remote: &dyn RemoteDataSource,
    collection: Collection,
    id: u64,
    record: &T,
) -> Result<T, StorageError> {
    let mut patch = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut patch {
        fields.remove("id");
    }
    let stored = remote.update(collection, id, patch).await?;
    Ok(serde_json::from_value(stored)?)
}

/// Read and decode a JSON value from the local store. Absent keys yield `None`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the stored value does not decode.
pub fn read_local<T: DeserializeOwned>(
    local: &dyn PersistentStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    local
        .get(key)
        .map(|raw| serde_json::from_str(&raw).map_err(StorageError::from))
        .transpose()
}

/// Encode `value` as JSON under `key` in the local store.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the write fails.
pub fn write_local<T: Serialize + ?Sized>(
    local: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    local.set(key, &serde_json::to_string(value)?)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRemote, MemoryStore};
    use quiz_core::model::AnsweredQuestion;
    use quiz_core::time::fixed_now;
    use serde_json::json;

    fn question(id: u64) -> Question {
        Question::from_persisted(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["yes".into(), "no".into()],
            0,
            "General Programming",
            Difficulty::Hard,
            2,
        )
        .unwrap()
    }

    #[test]
    fn question_record_reads_original_field_names() {
        let raw = json!({
            "id": 3,
            "question": "Which hook runs after mount?",
            "options": ["onMounted", "onCreated"],
            "correctAnswer": 0,
            "category": "Vue.js",
            "difficulty": "medium"
        });
        let record: QuestionRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.points, 1);
        let q = record.into_question().unwrap();
        assert_eq!(q.id(), QuestionId::new(3));
        assert_eq!(q.difficulty(), Difficulty::Medium);
        assert_eq!(q.correct_option(), "onMounted");
    }

    #[test]
    fn invalid_question_record_is_rejected() {
        let record = QuestionRecord {
            id: Some(1),
            question: "Broken".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: 4,
            category: "X".into(),
            difficulty: Difficulty::Easy,
            points: 1,
            created_at: None,
        };
        assert!(matches!(
            record.into_question().unwrap_err(),
            StorageError::Invalid(quiz_core::Error::Question(_))
        ));
    }

    #[test]
    fn user_record_maps_student_role() {
        let raw = json!({"id": 4, "name": "Ann", "email": "ann@example.com", "password": "secret1", "role": "student"});
        let record: UserRecord = serde_json::from_value(raw).unwrap();
        let identity = record.into_identity().unwrap();
        assert_eq!(identity.role(), Role::Learner);

        let cached = serde_json::to_value(UserRecord::from_identity(&identity)).unwrap();
        assert!(cached.get("password").is_none());
        assert_eq!(cached["role"], "student");
    }

    #[test]
    fn quiz_record_defaults_to_active() {
        let raw = json!({"id": 2, "title": "Basics", "questions": [1, 2]});
        let quiz = serde_json::from_value::<QuizRecord>(raw)
            .unwrap()
            .into_quiz()
            .unwrap();
        assert!(quiz.is_active());
        assert_eq!(quiz.question_ids(), &[QuestionId::new(1), QuestionId::new(2)]);
    }

    #[test]
    fn result_record_preserves_snapshot() {
        let owner = Identity::new(UserId::new(9), "Ann", "ann@example.com", Role::Learner);
        let q1 = question(1);
        let q2 = question(2);
        let a1 = AnsweredQuestion::record(&q1, 0, fixed_now()).unwrap();
        let entries = vec![
            ResultEntry::new(q1, Some(a1)).unwrap(),
            ResultEntry::new(q2, None).unwrap(),
        ];
        let result = QuizResult::from_entries(&owner, None, entries, 33, fixed_now()).unwrap();

        let record = ResultRecord::from_result(&result);
        assert_eq!(record.score, 50);
        assert_eq!(record.sync_status, SyncStatus::PendingSync);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["correctAnswers"], 1);
        assert_eq!(json["syncStatus"], "pending-sync");

        let back = serde_json::from_value::<ResultRecord>(json)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(back, result);
    }

    #[tokio::test]
    async fn typed_helpers_round_trip_through_remote() {
        let remote = InMemoryRemote::new();
        let stored = create(&remote, Collection::Questions, &QuestionRecord::from_question(&question(7)))
            .await
            .unwrap();
        assert_eq!(stored.id, Some(7));

        let mut edited = stored.clone();
        edited.question = "Edited".into();
        let merged: QuestionRecord = update(&remote, Collection::Questions, 7, &edited).await.unwrap();
        assert_eq!(merged.question, "Edited");

        let all: Vec<QuestionRecord> = fetch_all(&remote, Collection::Questions).await.unwrap();
        assert_eq!(all.len(), 1);
        let one: QuestionRecord = fetch_one(&remote, Collection::Questions, 7).await.unwrap();
        assert_eq!(one, merged);
    }

    #[test]
    fn local_helpers_tolerate_absence() {
        let store = MemoryStore::new();
        let missing: Option<Vec<u64>> = read_local(&store, "nothing").unwrap();
        assert!(missing.is_none());
        write_local(&store, "ids", &[1_u64, 2, 3]).unwrap();
        let ids: Option<Vec<u64>> = read_local(&store, "ids").unwrap();
        assert_eq!(ids, Some(vec![1, 2, 3]));

        store.set("broken", "{").unwrap();
        assert!(read_local::<Vec<u64>>(&store, "broken").is_err());
    }
}
