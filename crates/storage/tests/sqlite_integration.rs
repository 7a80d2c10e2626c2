use quiz_core::model::{Difficulty, Question, QuestionId};
use serde_json::json;
use storage::records::{self, QuestionRecord};
use storage::repository::{Collection, RemoteDataSource, StorageError};
use storage::sqlite::SqliteDataSource;

async fn source(name: &str) -> SqliteDataSource {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let source = SqliteDataSource::connect(&url).await.expect("connect");
    source.migrate().await.expect("migrate");
    source
}

#[tokio::test]
async fn sqlite_assigns_ids_per_collection() {
    let db = source("memdb_ids").await;

    let a = db
        .create(Collection::Questions, json!({"question": "a"}))
        .await
        .unwrap();
    let b = db
        .create(Collection::Questions, json!({"question": "b"}))
        .await
        .unwrap();
    let quiz = db
        .create(Collection::Quizzes, json!({"title": "t"}))
        .await
        .unwrap();

    assert_eq!(a["id"], 1);
    assert_eq!(b["id"], 2);
    assert_eq!(quiz["id"], 1);
    assert_eq!(db.list(Collection::Questions).await.unwrap().len(), 2);
}

#[tokio::test]
async fn sqlite_explicit_id_conflicts() {
    let db = source("memdb_conflict").await;
    db.create(Collection::Users, json!({"id": 4, "name": "Ann"}))
        .await
        .unwrap();
    let err = db
        .create(Collection::Users, json!({"id": 4, "name": "Bob"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    let stored = db.get(Collection::Users, 4).await.unwrap();
    assert_eq!(stored["name"], "Ann");
}

#[tokio::test]
async fn sqlite_update_merges_and_delete_removes() {
    let db = source("memdb_update").await;
    db.create(Collection::Quizzes, json!({"title": "Old", "isActive": true}))
        .await
        .unwrap();

    let merged = db
        .update(Collection::Quizzes, 1, json!({"title": "New"}))
        .await
        .unwrap();
    assert_eq!(merged, json!({"id": 1, "title": "New", "isActive": true}));
    assert!(matches!(
        db.update(Collection::Quizzes, 9, json!({})).await.unwrap_err(),
        StorageError::NotFound
    ));

    db.delete(Collection::Quizzes, 1).await.unwrap();
    assert!(matches!(
        db.get(Collection::Quizzes, 1).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert!(matches!(
        db.delete(Collection::Quizzes, 1).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_round_trips_typed_questions() {
    let db = source("memdb_typed").await;
    let question = Question::from_persisted(
        QuestionId::new(12),
        "What is `let`?",
        vec!["Binding".into(), "Loop".into()],
        0,
        "Rust",
        Difficulty::Easy,
        1,
    )
    .unwrap();

    records::create(&db, Collection::Questions, &QuestionRecord::from_question(&question))
        .await
        .unwrap();
    let fetched: Vec<QuestionRecord> = records::fetch_all(&db, Collection::Questions).await.unwrap();
    let back = fetched.into_iter().next().unwrap().into_question().unwrap();
    assert_eq!(back, question);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = source("memdb_migrate_twice").await;
    db.migrate().await.expect("second migrate");
    assert!(db.list(Collection::Results).await.unwrap().is_empty());
}
