//! Type-safe NATS KV store wrapper.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;

use async_nats::jetstream::{self, consumer, kv, stream};
use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    BatchKey, BatchRecord, BatchesBucket, KvBucket, KvKey, ResultKey, ResultRecord, ResultsBucket,
};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Upper bound for a single prefix scan.
const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Header set by the KV layer on delete and purge markers.
const KV_OPERATION_HEADER: &str = "KV-Operation";

/// Store of per-cell result records.
pub type ResultStore = KvStore<ResultKey, ResultRecord, ResultsBucket>;

/// Store of submitted batch shapes.
pub type BatchStore = KvStore<BatchKey, BatchRecord, BatchesBucket>;

/// Type-safe NATS KV store wrapper.
///
/// This store is generic over:
/// - `K`: The key type
/// - `V`: The value type to store (must be serializable)
/// - `B`: The bucket configuration (determines name, description, TTL)
#[derive(Clone)]
pub struct KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    store: kv::Store,
    stream: stream::Stream,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
    _bucket: PhantomData<B>,
}

impl<K, V, B> KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    /// Create or get a KV bucket using the bucket configuration.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn new(jetstream: &jetstream::Context) -> Result<Self> {
        Self::with_ttl(jetstream, B::TTL.unwrap_or_default()).await
    }

    /// Create or get a KV bucket with custom TTL.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn with_ttl(jetstream: &jetstream::Context, ttl: Duration) -> Result<Self> {
        let config = kv::Config {
            bucket: B::NAME.to_string(),
            description: B::DESCRIPTION.to_string(),
            max_age: ttl,
            ..Default::default()
        };

        let store = match jetstream.get_key_value(B::NAME).await {
            Ok(store) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    "Using existing KV bucket"
                );
                store
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    ttl_secs = ttl.as_secs(),
                    "Creating new KV bucket"
                );
                jetstream
                    .create_key_value(config)
                    .await
                    .map_err(|e| Error::operation("kv_create", e.to_string()))?
            }
        };

        // Backing stream of the bucket, used for prefix scans.
        let stream_name = format!("KV_{}", B::NAME);
        let stream = jetstream
            .get_stream(&stream_name)
            .await
            .map_err(|e| Error::stream_error(&stream_name, e.to_string()))?;

        Ok(Self {
            store,
            stream,
            _key: PhantomData,
            _value: PhantomData,
            _bucket: PhantomData,
        })
    }

    /// Put a value into the store, overwriting any previous revision.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn put(&self, key: &K, value: &V) -> Result<()> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let revision = self
            .store
            .put(&key_str, json.into())
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            bucket = %B::NAME,
            revision,
            size_bytes = size,
            "Put value to KV store"
        );
        Ok(())
    }

    /// Get the latest value of a key; deleted or purged keys read as missing.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let key_str = key.to_string();
        let entry = self
            .store
            .entry(&key_str)
            .await
            .map_err(|e| Error::operation("kv_get", e.to_string()))?;

        match entry {
            Some(entry) if entry.operation == kv::Operation::Put => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    bucket = %B::NAME,
                    revision = entry.revision,
                    "Retrieved value from KV store"
                );
                Ok(Some(serde_json::from_slice(&entry.value)?))
            }
            _ => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    bucket = %B::NAME,
                    "Key not found in KV store"
                );
                Ok(None)
            }
        }
    }

    /// Returns the latest value of every key under `{prefix}.`.
    ///
    /// Reads the bucket's backing stream through an ordered consumer that
    /// delivers the last message per subject, so the scan only touches keys
    /// of the given prefix. Deleted and purged keys are skipped.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(K, V)>> {
        let subject_prefix = format!("$KV.{}.", B::NAME);
        let filter_subject = format!("{subject_prefix}{prefix}.>");

        let scanner = self
            .stream
            .create_consumer(consumer::pull::OrderedConfig {
                filter_subject,
                deliver_policy: consumer::DeliverPolicy::LastPerSubject,
                replay_policy: consumer::ReplayPolicy::Instant,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::operation("kv_scan", e.to_string()))?;

        let mut pending = scanner.cached_info().num_pending;

        let mut entries = Vec::with_capacity(pending as usize);
        if pending == 0 {
            return Ok(entries);
        }

        let mut messages = scanner
            .messages()
            .await
            .map_err(|e| Error::operation("kv_scan", e.to_string()))?;

        let scan = async {
            while pending > 0 {
                let Some(message) = messages.next().await else {
                    break;
                };
                let message = message.map_err(|e| Error::operation("kv_scan", e.to_string()))?;
                pending = message
                    .info()
                    .map_err(|e| Error::operation("kv_scan", e.to_string()))?
                    .pending;

                let is_tombstone = message
                    .headers
                    .as_ref()
                    .is_some_and(|headers| headers.get(KV_OPERATION_HEADER).is_some());
                if is_tombstone {
                    continue;
                }

                let Some(key_str) = message.subject.as_str().strip_prefix(&subject_prefix) else {
                    continue;
                };
                let Ok(key) = key_str.parse::<K>() else {
                    tracing::warn!(
                        target: TRACING_TARGET_KV,
                        key = %key_str,
                        bucket = %B::NAME,
                        "Skipping unparseable key"
                    );
                    continue;
                };

                entries.push((key, serde_json::from_slice(&message.payload)?));
            }
            Ok::<_, Error>(())
        };

        tokio::time::timeout(SCAN_TIMEOUT, scan)
            .await
            .map_err(|_| Error::timeout(SCAN_TIMEOUT))??;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            prefix = %prefix,
            count = entries.len(),
            bucket = %B::NAME,
            "Scanned keys by prefix"
        );
        Ok(entries)
    }
}

impl ResultStore {
    /// Returns every result recorded for a batch, keyed by `"{row}:{col}"`.
    ///
    /// An unknown batch yields an empty map.
    pub async fn batch_results(&self, batch_id: &BatchKey) -> Result<BTreeMap<String, ResultRecord>> {
        let entries = self.entries_with_prefix(batch_id.as_str()).await?;
        Ok(entries
            .into_iter()
            .map(|(key, record)| (key.coordinate(), record))
            .collect())
    }
}
