//! In-memory batch backend for tests.
//!
//! This module is only available in tests or with the `test-utils` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use gridfill_nats::kv::{BatchKey, BatchRecord, ResultKey, ResultRecord};
use gridfill_nats::stream::JobEntry;
use gridfill_nats::{Error, Result};

use super::{BatchBackend, BatchStorage};

#[derive(Debug, Default)]
struct MemoryState {
    batches: HashMap<BatchKey, BatchRecord>,
    jobs: Vec<JobEntry>,
    results: HashMap<ResultKey, ResultRecord>,
}

/// [`BatchBackend`] that keeps everything in process memory.
///
/// Clones share the same state, so a test can keep one handle for
/// inspection while the pipeline writes through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    append_limit: Option<usize>,
    reject_batches: bool,
    reject_results: bool,
    disconnected: bool,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every job append after `limit` successful ones.
    #[must_use]
    pub fn with_append_limit(mut self, limit: usize) -> Self {
        self.append_limit = Some(limit);
        self
    }

    /// Fails every batch metadata write.
    #[must_use]
    pub fn rejecting_batches(mut self) -> Self {
        self.reject_batches = true;
        self
    }

    /// Fails every result write.
    #[must_use]
    pub fn rejecting_results(mut self) -> Self {
        self.reject_results = true;
        self
    }

    /// Reports the backend as disconnected.
    #[must_use]
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    /// Returns every appended job in append order.
    pub fn jobs(&self) -> Vec<JobEntry> {
        self.lock().jobs.clone()
    }

    /// Returns the number of stored result records.
    pub fn result_count(&self) -> usize {
        self.lock().results.len()
    }

    /// Returns the stored record for one cell.
    pub fn result(&self, key: &ResultKey) -> Option<ResultRecord> {
        self.lock().results.get(key).cloned()
    }

    /// Wraps a clone of this backend into a [`BatchStorage`].
    pub fn storage(&self) -> BatchStorage {
        BatchStorage::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BatchBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<Duration> {
        if self.disconnected {
            return Err(Error::operation("ping", "backend disconnected"));
        }
        Ok(Duration::ZERO)
    }

    async fn put_batch(&self, batch_id: &BatchKey, record: &BatchRecord) -> Result<()> {
        if self.reject_batches {
            return Err(Error::operation("put_batch", "batch bucket unavailable"));
        }
        self.lock().batches.insert(batch_id.clone(), record.clone());
        Ok(())
    }

    async fn get_batch(&self, batch_id: &BatchKey) -> Result<Option<BatchRecord>> {
        Ok(self.lock().batches.get(batch_id).cloned())
    }

    async fn append_job(&self, job: &JobEntry) -> Result<u64> {
        let mut state = self.lock();
        if self.append_limit.is_some_and(|limit| state.jobs.len() >= limit) {
            return Err(Error::delivery_failed("cell.jobs", "stream unavailable"));
        }
        state.jobs.push(job.clone());
        Ok(state.jobs.len() as u64)
    }

    async fn put_result(&self, key: &ResultKey, record: &ResultRecord) -> Result<()> {
        if self.reject_results {
            return Err(Error::operation("put_result", "result bucket unavailable"));
        }
        self.lock().results.insert(key.clone(), record.clone());
        Ok(())
    }

    async fn batch_results(
        &self,
        batch_id: &BatchKey,
    ) -> Result<BTreeMap<String, ResultRecord>> {
        Ok(self
            .lock()
            .results
            .iter()
            .filter(|(key, _)| &key.batch_id == batch_id)
            .map(|(key, record)| (key.coordinate(), record.clone()))
            .collect())
    }
}
