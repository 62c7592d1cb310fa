//! NATS client wrapper and connection management.
//!
//! The `NatsClient` is cheaply cloneable: clones share one multiplexed TCP
//! connection, so a single client is constructed at startup and handed to
//! the producer, the worker and the status query.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, jetstream};
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::kv::{BatchStore, KvStore, ResultStore};
use crate::stream::{ConsumerGroupConfig, EventSubscriber, JobPublisher, JobSubscriber};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// NATS client wrapper with connection management.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

/// Inner data for NATS client
#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a new NATS client and connect
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid_config)?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = %config.nats_url,
            "Connecting to NATS"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(config.name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout());

        if let Some(token) = &config.nats_token {
            connect_opts = connect_opts.token(token.clone());
        }

        if let Some(max_reconnects) = config.max_reconnects_option() {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }
        let reconnect_delay_ms = config.reconnect_delay().as_millis().min(u64::MAX as u128) as u64;
        connect_opts = connect_opts.reconnect_delay_callback(move |attempts| {
            Duration::from_millis(std::cmp::min(
                reconnect_delay_ms * 2_u64.pow(attempts.min(32) as u32),
                30_000,
            ))
        });

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            "Successfully connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
                config,
            }),
        })
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Test connectivity with a round trip to the server.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = std::time::Instant::now();
        let limit = Duration::from_secs(10);

        timeout(limit, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(limit))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let ping_time = start.elapsed();
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            duration_ms = ping_time.as_millis(),
            "NATS ping successful"
        );
        Ok(ping_time)
    }
}

// Key-value store getters
impl NatsClient {
    /// Get or create the per-cell result store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn result_store(&self) -> Result<ResultStore> {
        KvStore::new(&self.inner.jetstream).await
    }

    /// Get or create the batch shape store with a custom retention window.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn batch_store_with_ttl(&self, ttl: Duration) -> Result<BatchStore> {
        KvStore::with_ttl(&self.inner.jetstream, ttl).await
    }
}

// Job log getters
impl NatsClient {
    /// Create a publisher appending to the job log.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn job_publisher(&self) -> Result<JobPublisher> {
        JobPublisher::new(&self.inner.jetstream).await
    }

    /// Join the job log's consumer group described by `group`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn job_subscriber(&self, group: &ConsumerGroupConfig) -> Result<JobSubscriber> {
        EventSubscriber::new(&self.inner.jetstream, group).await
    }
}
