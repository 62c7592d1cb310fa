//! Batch storage seam shared by the HTTP layer and the worker.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridfill_nats::kv::{BatchKey, BatchRecord, BatchStore, ResultKey, ResultRecord, ResultStore};
use gridfill_nats::stream::{JobEntry, JobPublisher};
use gridfill_nats::{NatsClient, Result};

use crate::TRACING_TARGET_STORAGE;

/// Backend holding batch metadata, the job log and per-cell results.
#[async_trait]
pub trait BatchBackend: Send + Sync {
    /// Returns a short backend name for logging.
    fn name(&self) -> &'static str;

    /// Makes a round trip to the backend and returns its latency.
    async fn ping(&self) -> Result<Duration>;

    /// Persists the metadata of a newly submitted batch.
    async fn put_batch(&self, batch_id: &BatchKey, record: &BatchRecord) -> Result<()>;

    /// Returns the stored metadata of a batch, if still retained.
    async fn get_batch(&self, batch_id: &BatchKey) -> Result<Option<BatchRecord>>;

    /// Appends a job to the job log and returns its sequence number.
    async fn append_job(&self, job: &JobEntry) -> Result<u64>;

    /// Writes the result of one cell, replacing any earlier record.
    async fn put_result(&self, key: &ResultKey, record: &ResultRecord) -> Result<()>;

    /// Returns every result recorded for a batch keyed by `"{row}:{col}"`.
    async fn batch_results(&self, batch_id: &BatchKey)
    -> Result<BTreeMap<String, ResultRecord>>;
}

/// Shared handle to the configured [`BatchBackend`].
#[derive(Clone)]
pub struct BatchStorage {
    inner: Arc<dyn BatchBackend>,
}

impl BatchStorage {
    /// Wraps a backend.
    pub fn new<B>(backend: B) -> Self
    where
        B: BatchBackend + 'static,
    {
        Self {
            inner: Arc::new(backend),
        }
    }

    /// Opens the NATS-backed stores and the job publisher.
    pub async fn nats(client: &NatsClient, batch_ttl: Duration) -> Result<Self> {
        Ok(Self::new(NatsBackend::open(client, batch_ttl).await?))
    }

    /// Returns the backend name.
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Checks that the backend answers.
    pub async fn ping(&self) -> Result<Duration> {
        self.inner.ping().await
    }

    /// Persists batch metadata.
    pub async fn put_batch(&self, batch_id: &BatchKey, record: &BatchRecord) -> Result<()> {
        self.inner.put_batch(batch_id, record).await
    }

    /// Returns stored batch metadata.
    pub async fn get_batch(&self, batch_id: &BatchKey) -> Result<Option<BatchRecord>> {
        self.inner.get_batch(batch_id).await
    }

    /// Appends a job to the log.
    pub async fn append_job(&self, job: &JobEntry) -> Result<u64> {
        self.inner.append_job(job).await
    }

    /// Writes one cell result.
    pub async fn put_result(&self, key: &ResultKey, record: &ResultRecord) -> Result<()> {
        self.inner.put_result(key, record).await
    }

    /// Reads all results of a batch.
    pub async fn batch_results(
        &self,
        batch_id: &BatchKey,
    ) -> Result<BTreeMap<String, ResultRecord>> {
        self.inner.batch_results(batch_id).await
    }
}

impl fmt::Debug for BatchStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchStorage")
            .field("backend", &self.inner.name())
            .finish()
    }
}

/// [`BatchBackend`] over JetStream key-value buckets and the job stream.
pub struct NatsBackend {
    client: NatsClient,
    batches: BatchStore,
    results: ResultStore,
    jobs: JobPublisher,
}

impl NatsBackend {
    /// Creates or binds every bucket and stream the pipeline uses.
    #[tracing::instrument(skip(client), target = TRACING_TARGET_STORAGE)]
    pub async fn open(client: &NatsClient, batch_ttl: Duration) -> Result<Self> {
        let backend = Self {
            client: client.clone(),
            batches: client.batch_store_with_ttl(batch_ttl).await?,
            results: client.result_store().await?,
            jobs: client.job_publisher().await?,
        };

        tracing::info!(
            target: TRACING_TARGET_STORAGE,
            batch_ttl_secs = batch_ttl.as_secs(),
            "Batch storage ready"
        );

        Ok(backend)
    }
}

#[async_trait]
impl BatchBackend for NatsBackend {
    fn name(&self) -> &'static str {
        "nats"
    }

    async fn ping(&self) -> Result<Duration> {
        self.client.ping().await
    }

    async fn put_batch(&self, batch_id: &BatchKey, record: &BatchRecord) -> Result<()> {
        self.batches.put(batch_id, record).await
    }

    async fn get_batch(&self, batch_id: &BatchKey) -> Result<Option<BatchRecord>> {
        self.batches.get(batch_id).await
    }

    async fn append_job(&self, job: &JobEntry) -> Result<u64> {
        self.jobs.append(job).await
    }

    async fn put_result(&self, key: &ResultKey, record: &ResultRecord) -> Result<()> {
        self.results.put(key, record).await
    }

    async fn batch_results(
        &self,
        batch_id: &BatchKey,
    ) -> Result<BTreeMap<String, ResultRecord>> {
        self.results.batch_results(batch_id).await
    }
}
