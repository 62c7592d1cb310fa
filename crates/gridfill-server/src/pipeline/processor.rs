//! Processing of a single claimed job entry.

use std::time::Duration;

use gridfill_completion::{CompletionRequest, CompletionService};
use gridfill_nats::kv::ResultRecord;
use gridfill_nats::stream::JobEntry;
use strum::{AsRefStr, Display};

use super::prompt::prompt_for;
use crate::service::BatchStorage;

/// Tracing target for job processing.
const TRACING_TARGET: &str = "gridfill_server::pipeline::processor";

/// Default completion deadline per job.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobOutcome {
    /// A completed result record was written.
    Completed,
    /// The completion failed and nothing was written.
    Failed,
    /// The completion failed and a failed record was written.
    FailureRecorded,
    /// The completion failed and the entry should be delivered again.
    Retrying,
    /// The result could not be written.
    StoreFailed,
}

impl JobOutcome {
    /// Returns true if the entry should be acknowledged.
    ///
    /// Entries that are not acknowledged are redelivered until the consumer
    /// group's delivery limit is reached.
    #[inline]
    pub fn should_ack(self) -> bool {
        !matches!(self, Self::Retrying | Self::StoreFailed)
    }
}

/// Turns job entries into result records.
#[derive(Debug, Clone)]
pub struct JobProcessor {
    storage: BatchStorage,
    completion: CompletionService,
    timeout: Duration,
    record_failures: bool,
    retry_failures: bool,
    max_deliver: i64,
}

impl JobProcessor {
    /// Creates a processor with the default failure handling.
    pub fn new(storage: BatchStorage, completion: CompletionService) -> Self {
        Self {
            storage,
            completion,
            timeout: DEFAULT_COMPLETION_TIMEOUT,
            record_failures: false,
            retry_failures: false,
            max_deliver: -1,
        }
    }

    /// Sets the completion deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Writes a failed record when a completion fails.
    #[must_use]
    pub fn with_record_failures(mut self, record_failures: bool) -> Self {
        self.record_failures = record_failures;
        self
    }

    /// Requests redelivery when a completion fails.
    ///
    /// The last allowed delivery falls back to the normal failure handling.
    /// A `max_deliver` of -1 retries without limit.
    #[must_use]
    pub fn with_retry_failures(mut self, retry_failures: bool, max_deliver: i64) -> Self {
        self.retry_failures = retry_failures;
        self.max_deliver = max_deliver;
        self
    }

    /// Completes one job and records its result.
    ///
    /// `delivery_count` starts at 1 for the first delivery.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET,
        fields(
            batch_id = %job.batch_id(),
            kind = %job.kind(),
            row = job.position().0,
            col = job.position().1,
        )
    )]
    pub async fn process(&self, job: &JobEntry, delivery_count: u64) -> JobOutcome {
        let request = CompletionRequest::new(prompt_for(job)).with_timeout(self.timeout);

        let error = match self.completion.complete(&request).await {
            Ok(response) => {
                let record = ResultRecord::completed(response.text, response.trace_id);
                return self.store(job, &record, JobOutcome::Completed).await;
            }
            Err(error) => error,
        };

        if self.retry_failures && !self.is_last_delivery(delivery_count) {
            tracing::warn!(
                target: TRACING_TARGET,
                delivery_count,
                max_deliver = self.max_deliver,
                error = %error,
                "Completion failed, requesting redelivery"
            );
            return JobOutcome::Retrying;
        }

        tracing::error!(
            target: TRACING_TARGET,
            delivery_count,
            error = %error,
            "Completion failed"
        );

        if self.record_failures {
            let record = ResultRecord::failed(error.to_string());
            return self.store(job, &record, JobOutcome::FailureRecorded).await;
        }

        JobOutcome::Failed
    }

    async fn store(&self, job: &JobEntry, record: &ResultRecord, outcome: JobOutcome) -> JobOutcome {
        match self.storage.put_result(&job.result_key(), record).await {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    status = %record.status,
                    "Result recorded"
                );
                outcome
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Failed to write result"
                );
                JobOutcome::StoreFailed
            }
        }
    }

    fn is_last_delivery(&self, delivery_count: u64) -> bool {
        u64::try_from(self.max_deliver).is_ok_and(|max| delivery_count >= max)
    }
}
