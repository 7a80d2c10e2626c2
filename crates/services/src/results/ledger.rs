use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use quiz_core::model::{Difficulty, Identity, QuizResult, QuizSettings, ResultId, SyncStatus};
use storage::records::{self, ResultRecord};
use storage::repository::{
    Collection, PersistentStore, RemoteDataSource, Storage, StorageError, keys,
};

use super::stats::{self, BucketStat, RECENT_RESULTS, ResultAggregates};
use crate::Clock;
use crate::error::LedgerError;
use crate::sessions::QuizSession;

/// Records completed sessions and answers statistics over them.
///
/// Writes go to the remote data source first; when that fails the result is
/// queued in the local store as pending-sync and still handed back to the caller.
pub struct ResultsLedger {
    clock: Clock,
    settings: QuizSettings,
    remote: Arc<dyn RemoteDataSource>,
    local: Arc<dyn PersistentStore>,
    results: Mutex<Vec<QuizResult>>,
    /// Held for every read-modify-write of the local pending queue.
    queue: Mutex<()>,
    sync_gate: tokio::sync::Mutex<()>,
}

impl ResultsLedger {
    #[must_use]
    pub fn new(clock: Clock, settings: QuizSettings, storage: &Storage) -> Self {
        Self {
            clock,
            settings,
            remote: Arc::clone(&storage.remote),
            local: Arc::clone(&storage.local),
            results: Mutex::new(Vec::new()),
            queue: Mutex::new(()),
            sync_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Vec<QuizResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue_guard(&self) -> MutexGuard<'_, ()> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the result for a completed session and store it.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotCompleted` unless the session is completed. A failed
    /// remote write is not an error: the result comes back as pending-sync.
    pub async fn commit(
        &self,
        session: &QuizSession,
        identity: &Identity,
        time_spent_secs: u32,
    ) -> Result<QuizResult, LedgerError> {
        if !session.is_completed() {
            return Err(LedgerError::NotCompleted);
        }
        let mut result = QuizResult::from_entries(
            identity,
            session.quiz().cloned(),
            session.snapshot()?,
            time_spent_secs,
            self.clock.now(),
        )?;

        match self.write_remote(&result).await {
            Ok(id) => {
                result.mark_synced(id);
                info!(result_id = %id, score = result.score(), "quiz result stored");
            }
            Err(e) => {
                warn!(error = %e, local_id = %result.local_id(), "result write failed; queued for sync");
                if let Err(e) = self.push_pending(&result) {
                    error!(error = %e, local_id = %result.local_id(), "could not queue pending result");
                }
            }
        }

        self.cache().push(result.clone());
        Ok(result)
    }

    async fn write_remote(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let record = ResultRecord::from_result(result).with_sync_status(SyncStatus::Synced);
        let stored = records::create(self.remote.as_ref(), Collection::Results, &record).await?;
        stored
            .id
            .map(ResultId::new)
            .ok_or_else(|| StorageError::Serialization("stored result has no id".into()))
    }

    fn pending_records(&self) -> Vec<ResultRecord> {
        match records::read_local(self.local.as_ref(), keys::PENDING_RESULTS) {
            Ok(pending) => pending.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "pending results queue is unreadable; ignoring it");
                Vec::new()
            }
        }
    }

    fn write_pending(&self, pending: &[ResultRecord]) -> Result<(), StorageError> {
        if pending.is_empty() {
            self.local.remove(keys::PENDING_RESULTS)
        } else {
            records::write_local(self.local.as_ref(), keys::PENDING_RESULTS, pending)
        }
    }

    fn push_pending(&self, result: &QuizResult) -> Result<(), StorageError> {
        let _queue = self.queue_guard();
        let mut pending = self.pending_records();
        pending.push(ResultRecord::from_result(result));
        self.write_pending(&pending)
    }

    /// Results waiting for a successful remote write.
    #[must_use]
    pub fn pending(&self) -> Vec<QuizResult> {
        decode_all(self.pending_records())
    }

    /// Refresh results from the remote source, falling back to the local cache
    /// when it is unreachable. Pending results are always included.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the remote answers with a definite error.
    pub async fn load_results(&self) -> Result<Vec<QuizResult>, LedgerError> {
        let fetched: Result<Vec<ResultRecord>, StorageError> =
            records::fetch_all(self.remote.as_ref(), Collection::Results).await;
        let loaded = match fetched {
            Ok(list) => {
                if let Err(e) = records::write_local(self.local.as_ref(), keys::RESULTS_CACHE, &list)
                {
                    warn!(error = %e, "could not cache results locally");
                }
                list
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "results unavailable; using local cache");
                records::read_local(self.local.as_ref(), keys::RESULTS_CACHE)
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "results cache is unreadable");
                        None
                    })
                    .unwrap_or_default()
            }
            Err(e) => return Err(e.into()),
        };

        let mut results = decode_all(loaded);
        for pending in self.pending() {
            if !results.iter().any(|r| r.local_id() == pending.local_id()) {
                results.push(pending);
            }
        }

        let mut cache = self.cache();
        cache.clone_from(&results);
        Ok(results)
    }

    /// Retry every pending write once. Returns how many were stored.
    ///
    /// Results already present remotely (matched by local id) are not uploaded
    /// again. Only the results stored here leave the queue; anything queued by a
    /// concurrent `commit` stays.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the queue cannot be rewritten.
    pub async fn sync_pending(&self) -> Result<usize, LedgerError> {
        let _sync = self.sync_gate.lock().await;
        let pending = self.pending_records();
        if pending.is_empty() {
            return Ok(0);
        }

        let stored = match self.remote.list(Collection::Results).await {
            Ok(docs) => docs
                .iter()
                .filter_map(|doc| {
                    let local_id = doc.get("localId")?.as_str()?.to_string();
                    Some((local_id, doc.get("id")?.as_u64()?))
                })
                .collect::<HashMap<String, u64>>(),
            Err(e) => {
                warn!(error = %e, queued = pending.len(), "results unavailable; pending results stay queued");
                return Ok(0);
            }
        };

        let mut synced = Vec::new();
        for record in pending {
            if let Some(&id) = stored.get(&record.local_id.to_string()) {
                debug!(local_id = %record.local_id, "pending result already stored");
                synced.push((record.local_id, id));
                continue;
            }
            let upload = record.clone().with_sync_status(SyncStatus::Synced);
            match records::create(self.remote.as_ref(), Collection::Results, &upload).await {
                Ok(ResultRecord { id: Some(id), .. }) => synced.push((record.local_id, id)),
                Ok(_) => warn!(local_id = %record.local_id, "stored result came back without an id"),
                Err(e) => {
                    warn!(error = %e, local_id = %record.local_id, "pending result still not stored");
                }
            }
        }

        let remaining = {
            let _queue = self.queue_guard();
            let mut remaining = self.pending_records();
            remaining.retain(|r| !synced.iter().any(|(local_id, _)| *local_id == r.local_id));
            self.write_pending(&remaining)?;
            remaining.len()
        };

        let mut cache = self.cache();
        for (local_id, id) in &synced {
            if let Some(result) = cache.iter_mut().find(|r| r.local_id() == *local_id) {
                result.mark_synced(ResultId::new(*id));
            }
        }
        info!(synced = synced.len(), remaining, "pending results synced");
        Ok(synced.len())
    }

    /// Every result known to the ledger, in insertion order.
    #[must_use]
    pub fn results(&self) -> Vec<QuizResult> {
        self.cache().clone()
    }

    /// The identity's own results, or all results for an admin; newest first.
    #[must_use]
    pub fn results_for(&self, identity: &Identity) -> Vec<QuizResult> {
        let mut visible: Vec<QuizResult> = self
            .cache()
            .iter()
            .filter(|r| identity.is_admin() || r.owner() == identity.id())
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
        visible
    }

    #[must_use]
    pub fn aggregates_for(&self, identity: &Identity) -> ResultAggregates {
        stats::aggregates(&self.results_for(identity), RECENT_RESULTS)
    }

    #[must_use]
    pub fn category_breakdown(&self) -> BTreeMap<String, BucketStat> {
        stats::by_category(self.cache().iter())
    }

    #[must_use]
    pub fn difficulty_breakdown(&self) -> BTreeMap<Difficulty, BucketStat> {
        stats::by_difficulty(self.cache().iter())
    }

    #[must_use]
    pub fn is_passed(&self, result: &QuizResult) -> bool {
        self.settings.is_passing(result.score())
    }
}

fn decode_all(records: Vec<ResultRecord>) -> Vec<QuizResult> {
    records
        .into_iter()
        .filter_map(|record| {
            let local_id = record.local_id;
            record
                .into_result()
                .map_err(|e| warn!(error = %e, %local_id, "skipping undecodable result"))
                .ok()
        })
        .collect()
}
