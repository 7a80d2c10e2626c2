use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::repository::{Collection, PersistentStore, RemoteDataSource, StorageError};

#[derive(Default)]
struct Documents {
    collections: HashMap<Collection, BTreeMap<u64, Value>>,
}

impl Documents {
    fn next_id(&self, collection: Collection) -> Result<u64, StorageError> {
        match self
            .collections
            .get(&collection)
            .and_then(|docs| docs.keys().next_back())
        {
            None => Ok(1),
            Some(max) => max.checked_add(1).ok_or(StorageError::Conflict),
        }
    }
}

/// In-memory remote that behaves like a small REST document server.
///
/// Ids are assigned incrementally per collection unless the entity already carries
/// an unused numeric `id`. `set_offline(true)` makes every call fail with
/// `StorageError::Network`, which tests use to exercise fallback paths.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    docs: Arc<Mutex<Documents>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of entities currently stored in `collection`, ignoring offline mode.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.docs
            .lock()
            .map(|docs| docs.collections.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.is_offline() {
            return Err(StorageError::Network("remote unreachable".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Documents>, StorageError> {
        self.docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn entity_id(value: &Value) -> Option<u64> {
    value.get("id").and_then(Value::as_u64)
}

#[async_trait]
impl RemoteDataSource for InMemoryRemote {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
        self.ensure_online()?;
        let guard = self.lock()?;
        Ok(guard
            .collections
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: u64) -> Result<Value, StorageError> {
        self.ensure_online()?;
        let guard = self.lock()?;
        guard
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(&id))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn create(&self, collection: Collection, entity: Value) -> Result<Value, StorageError> {
        self.ensure_online()?;
        let Value::Object(mut fields) = entity else {
            return Err(StorageError::Serialization(format!(
                "{collection} entity must be a JSON object"
            )));
        };

        let mut guard = self.lock()?;
        let id = match fields.get("id").and_then(Value::as_u64) {
            Some(id) => id,
            None => guard.next_id(collection)?,
        };
        let docs = guard.collections.entry(collection).or_default();
        if docs.contains_key(&id) {
            return Err(StorageError::Conflict);
        }
        fields.insert("id".into(), Value::from(id));
        let stored = Value::Object(fields);
        docs.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        id: u64,
        patch: Value,
    ) -> Result<Value, StorageError> {
        self.ensure_online()?;
        let Value::Object(patch) = patch else {
            return Err(StorageError::Serialization("patch must be a JSON object".into()));
        };

        let mut guard = self.lock()?;
        let existing = guard
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or(StorageError::NotFound)?;
        if let Value::Object(fields) = existing {
            for (key, value) in patch {
                if key != "id" {
                    fields.insert(key, value);
                }
            }
        }
        debug_assert_eq!(entity_id(existing), Some(id));
        Ok(existing.clone())
    }

    async fn delete(&self, collection: Collection, id: u64) -> Result<(), StorageError> {
        self.ensure_online()?;
        let mut guard = self.lock()?;
        guard
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.remove(&id))
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

/// Process-local key/value store, the equivalent of browser local storage in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    read_only: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes fail, simulating a full or disabled local store.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn writable(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("local store is read-only".into()));
        }
        self.entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writable()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.writable()?.remove(key);
        Ok(())
    }
}
