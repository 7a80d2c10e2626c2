use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::memory::{InMemoryRemote, MemoryStore};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("network error: {0}")]
    Network(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("remote rejected request with status {0}")]
    Status(u16),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid record: {0}")]
    Invalid(#[from] quiz_core::Error),
}

impl StorageError {
    /// True when the backend could not be reached at all, as opposed to
    /// answering with a definite error.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Network(_) | StorageError::Connection(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Resource collections exposed by the remote data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Questions,
    Quizzes,
    Results,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Questions,
        Collection::Quizzes,
        Collection::Results,
        Collection::Users,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Questions => "questions",
            Collection::Quizzes => "quizzes",
            Collection::Results => "results",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async document store holding the shared quiz data.
///
/// Entities are JSON objects carrying a numeric `id`. Implementations report an
/// unreachable backend as `StorageError::Network` and a missing id as
/// `StorageError::NotFound`.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Fetch every entity in a collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StorageError>;

    /// Fetch a single entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no entity has this id.
    async fn get(&self, collection: Collection, id: u64) -> Result<Value, StorageError>;

    /// Store a new entity and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entity cannot be stored.
    async fn create(&self, collection: Collection, entity: Value) -> Result<Value, StorageError>;

    /// Shallow-merge `patch` into an existing entity and return the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no entity has this id.
    async fn update(
        &self,
        collection: Collection,
        id: u64,
        patch: Value,
    ) -> Result<Value, StorageError>;

    /// Remove an entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no entity has this id.
    async fn delete(&self, collection: Collection, id: u64) -> Result<(), StorageError>;
}

/// Synchronous local key/value store. Last write wins; reads tolerate absence.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be removed.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Well-known keys used in the local store.
pub mod keys {
    pub const USER: &str = "quiz_app_user";
    pub const OFFLINE_QUESTIONS: &str = "quiz_app_offline_data";
    pub const OFFLINE_QUIZZES: &str = "quiz_app_offline_quizzes";
    pub const RESULTS_CACHE: &str = "quiz_app_results_cache";
    pub const PENDING_RESULTS: &str = "quiz_app_pending_results";
}

/// Remote and local tiers behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub remote: Arc<dyn RemoteDataSource>,
    pub local: Arc<dyn PersistentStore>,
}

impl Storage {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDataSource>, local: Arc<dyn PersistentStore>) -> Self {
        Self { remote, local }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        let remote: Arc<dyn RemoteDataSource> = Arc::new(InMemoryRemote::new());
        let local: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
        Self { remote, local }
    }
}
