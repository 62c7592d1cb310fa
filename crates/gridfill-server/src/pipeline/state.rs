//! Pipeline state and configuration.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use gridfill_completion::CompletionService;
use gridfill_nats::NatsClient;
use gridfill_nats::stream::{ConsumerGroupConfig, JobSubscriber};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::JobProcessor;
use crate::service::{BatchStorage, ServiceState};
use crate::{Error, Result};

/// Default maximum concurrent jobs.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 10;

/// Default number of entries claimed per read.
pub const DEFAULT_FETCH_BATCH: usize = 10;

/// Default idle wait of a read, in seconds.
pub const DEFAULT_FETCH_WAIT_SECS: u64 = 2;

/// Default completion deadline, in seconds.
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 30;

/// Configuration for the consumer-group worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PipelineConfig {
    /// Maximum concurrent jobs the worker processes simultaneously
    #[cfg_attr(
        feature = "config",
        arg(long, env = "WORKER_MAX_CONCURRENT_JOBS", default_value_t = DEFAULT_MAX_CONCURRENT_JOBS)
    )]
    pub max_concurrent_jobs: usize,

    /// Maximum entries claimed per read
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-fetch-batch", env = "WORKER_FETCH_BATCH", default_value_t = DEFAULT_FETCH_BATCH)
    )]
    pub fetch_batch: usize,

    /// Seconds a read blocks when no entries are available
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-fetch-wait", env = "WORKER_FETCH_WAIT_SECS", default_value_t = DEFAULT_FETCH_WAIT_SECS)
    )]
    pub fetch_wait_secs: u64,

    /// Seconds a single completion may take
    #[cfg_attr(
        feature = "config",
        arg(long = "completion-timeout", env = "WORKER_COMPLETION_TIMEOUT_SECS", default_value_t = DEFAULT_COMPLETION_TIMEOUT_SECS)
    )]
    pub completion_timeout_secs: u64,

    /// Write a failed result record when a completion fails
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-record-failures", env = "WORKER_RECORD_FAILURES")
    )]
    pub record_failures: bool,

    /// Request redelivery of failed completions until the delivery limit
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-retry-failures", env = "WORKER_RETRY_FAILURES")
    )]
    pub retry_failures: bool,

    /// Consumer group settings.
    #[cfg_attr(feature = "config", command(flatten))]
    pub consumer_group: ConsumerGroupConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            fetch_batch: DEFAULT_FETCH_BATCH,
            fetch_wait_secs: DEFAULT_FETCH_WAIT_SECS,
            completion_timeout_secs: DEFAULT_COMPLETION_TIMEOUT_SECS,
            record_failures: false,
            retry_failures: false,
            consumer_group: ConsumerGroupConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum concurrent jobs.
    #[must_use]
    pub fn with_max_concurrent_jobs(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs;
        self
    }

    /// Sets the consumer group settings.
    #[must_use]
    pub fn with_consumer_group(mut self, consumer_group: ConsumerGroupConfig) -> Self {
        self.consumer_group = consumer_group;
        self
    }

    /// Enables the failed-record and redelivery paths.
    #[must_use]
    pub fn with_failure_handling(mut self, record_failures: bool, retry_failures: bool) -> Self {
        self.record_failures = record_failures;
        self.retry_failures = retry_failures;
        self
    }

    /// Returns the idle wait of a read.
    #[inline]
    pub fn fetch_wait(&self) -> Duration {
        Duration::from_secs(self.fetch_wait_secs)
    }

    /// Returns the completion deadline.
    #[inline]
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(Error::config("Max concurrent jobs must be at least 1"));
        }
        if self.max_concurrent_jobs > Semaphore::MAX_PERMITS {
            return Err(Error::config(format!(
                "Max concurrent jobs must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.fetch_batch == 0 {
            return Err(Error::config("Fetch batch must be at least 1"));
        }
        if self.fetch_wait_secs == 0 {
            return Err(Error::config("Fetch wait must be at least one second"));
        }
        if self.completion_timeout_secs == 0 {
            return Err(Error::config("Completion timeout must be at least one second"));
        }
        self.consumer_group.validate().map_err(Error::config)
    }

    /// Creates a semaphore for limiting concurrent job processing.
    pub fn create_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.max_concurrent_jobs))
    }

    /// Builds the job processor these settings describe.
    pub fn create_processor(
        &self,
        storage: BatchStorage,
        completion: CompletionService,
    ) -> JobProcessor {
        JobProcessor::new(storage, completion)
            .with_timeout(self.completion_timeout())
            .with_record_failures(self.record_failures)
            .with_retry_failures(self.retry_failures, self.consumer_group.max_deliver)
    }
}

/// Application state for the pipeline worker.
///
/// Contains the services needed to claim and process job entries.
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// NATS messaging client.
    pub nats: NatsClient,
    /// Result and job storage.
    pub storage: BatchStorage,
    /// Completion backend.
    pub completion: CompletionService,
    /// Pipeline configuration.
    pub config: PipelineConfig,
}

impl PipelineState {
    /// Creates a new pipeline state from service state and configuration.
    pub fn new(state: &ServiceState, nats: NatsClient, config: PipelineConfig) -> Self {
        Self {
            nats,
            storage: state.storage.clone(),
            completion: state.completion.clone(),
            config,
        }
    }

    /// Joins the configured consumer group, creating it on first use.
    ///
    /// Called before the HTTP server starts so that a broker that cannot
    /// host the group stops startup instead of leaving jobs unclaimed.
    pub async fn join_consumer_group(&self) -> Result<JobSubscriber> {
        self.nats
            .job_subscriber(&self.config.consumer_group)
            .await
            .map_err(|e| {
                Error::external("nats", "Failed to join consumer group").with_source(e)
            })
    }

        /// Builds the processor used by every worker task.
    pub fn processor(&self) -> JobProcessor {
        self.config
            .create_processor(self.storage.clone(), self.completion.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_concurrent_jobs, 10);
        assert_eq!(config.fetch_batch, 10);
        assert_eq!(config.fetch_wait(), Duration::from_secs(2));
        assert_eq!(config.completion_timeout(), Duration::from_secs(30));
        assert!(!config.record_failures);
        assert!(!config.retry_failures);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::new().with_max_concurrent_jobs(0).validate().is_err());

        let group = ConsumerGroupConfig::default().with_group_name("bad group");
        assert!(PipelineConfig::new().with_consumer_group(group).validate().is_err());
    }

    #[test]
    fn test_concurrency_bounds_have_distinct_messages() {
        let too_low = PipelineConfig::new().with_max_concurrent_jobs(0).validate();
        let too_high = PipelineConfig::new()
            .with_max_concurrent_jobs(Semaphore::MAX_PERMITS + 1)
            .validate();

        assert!(too_low.is_err_and(|e| e.to_string().contains("at least 1")));
        assert!(too_high.is_err_and(|e| e.to_string().contains("at most")));
    }

    #[test]
    fn test_semaphore_matches_limit() {
        let semaphore = PipelineConfig::new()
            .with_max_concurrent_jobs(3)
            .create_semaphore();
        assert_eq!(semaphore.available_permits(), 3);
    }
}
