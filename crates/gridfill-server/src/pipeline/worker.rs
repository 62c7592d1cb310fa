//! Consumer-group worker loop.

use std::sync::Arc;
use std::time::Duration;

use gridfill_nats::stream::{JobEntry, JobSubscriber, Settle, TypedMessage};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{JobOutcome, JobProcessor, PipelineState};
use crate::Result;

/// Tracing target for worker infrastructure.
const TRACING_TARGET: &str = "gridfill_server::pipeline::worker";

/// Delay before a nak'd entry is offered again.
const REDELIVERY_DELAY: Duration = Duration::from_secs(5);

/// Worker that claims job entries from the shared consumer group.
///
/// Reads batches of entries, processes each on its own task with
/// semaphore-based limiting, and stops reading once cancelled. In-flight
/// jobs are drained before [`run`](Self::run) returns.
pub struct Worker {
    state: PipelineState,
    subscriber: JobSubscriber,
    processor: JobProcessor,
    consumer_name: String,
    cancel_token: CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl Worker {
    /// Creates a worker reading from an already joined consumer group.
    pub fn new(
        state: PipelineState,
        subscriber: JobSubscriber,
        consumer_name: impl Into<String>,
        cancel_token: CancellationToken,
        semaphore: Arc<Semaphore>,
    ) -> Self {
        Self {
            processor: state.processor(),
            state,
            subscriber,
            consumer_name: consumer_name.into(),
            cancel_token,
            semaphore,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the worker loop until cancelled.
    pub async fn run(self) -> Result<()> {
        let config = &self.state.config;

        tracing::info!(
            target: TRACING_TARGET,
            consumer = %self.consumer_name,
            group = %self.subscriber.group_name(),
            fetch_batch = config.fetch_batch,
            "Starting worker"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        consumer = %self.consumer_name,
                        "Shutdown requested, stopping worker"
                    );
                    break;
                }

                result = self.subscriber.fetch(config.fetch_batch, config.fetch_wait()) => {
                    match result {
                        Ok(messages) => {
                            for message in messages {
                                if !self.dispatch(message).await {
                                    break;
                                }
                            }
                        }
                        Err(err) => {
                            tracing::error!(
                                target: TRACING_TARGET,
                                consumer = %self.consumer_name,
                                error = %err,
                                "Failed to fetch messages"
                            );
                            tokio::time::sleep(config.fetch_wait()).await;
                        }
                    }
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    /// Hands a claimed entry to its own task, returning false if the
    /// semaphore is closed.
    async fn dispatch(&self, message: TypedMessage<JobEntry>) -> bool {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    "Semaphore closed, stopping dispatch"
                );
                return false;
            }
        };

        let processor = self.processor.clone();
        tokio::spawn(async move {
            // Hold permit until the entry is settled
            let _permit = permit;
            let delivery_count = message.delivery_count().unwrap_or(1);
            settle_job(&processor, message.payload(), delivery_count, &message).await;
        });

        true
    }

    /// Waits until every in-flight job has released its permit.
    async fn drain(&self) {
        let Ok(permits) = u32::try_from(self.state.config.max_concurrent_jobs) else {
            return;
        };

        tracing::debug!(
            target: TRACING_TARGET,
            in_flight = self.state.config.max_concurrent_jobs - self.semaphore.available_permits(),
            "Draining in-flight jobs"
        );

        if self.semaphore.acquire_many(permits).await.is_ok() {
            tracing::info!(
                target: TRACING_TARGET,
                consumer = %self.consumer_name,
                "Worker stopped"
            );
        }
    }
}

/// Processes one entry and settles it with the consumer group.
///
/// Acknowledged entries are done; every other outcome is offered again after
/// [`REDELIVERY_DELAY`], so a job is completed at least once.
async fn settle_job<M: Settle>(
    processor: &JobProcessor,
    job: &JobEntry,
    delivery_count: u64,
    message: &M,
) -> JobOutcome {
    tracing::debug!(
        target: TRACING_TARGET,
        batch_id = %job.batch_id(),
        kind = %job.kind(),
        delivery_count,
        "Processing job"
    );

    let outcome = processor.process(job, delivery_count).await;

    let settled = if outcome.should_ack() {
        message.ack().await
    } else {
        message.nack(Some(REDELIVERY_DELAY)).await
    };

    match settled {
        Ok(()) => {
            tracing::debug!(
                target: TRACING_TARGET,
                batch_id = %job.batch_id(),
                outcome = %outcome,
                "Job settled"
            );
        }
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                batch_id = %job.batch_id(),
                outcome = %outcome,
                error = %err,
                "Failed to settle message, it will be redelivered"
            );
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gridfill_completion::MockProvider;

    use super::*;
    use crate::service::MemoryBackend;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Settled {
        Ack,
        Nack(Option<Duration>),
        Term,
    }

    #[derive(Default)]
    struct RecordingMessage {
        calls: Mutex<Vec<Settled>>,
        fail: bool,
    }

    impl RecordingMessage {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn record(&self, call: Settled) -> gridfill_nats::Result<()> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
            if self.fail {
                return Err(gridfill_nats::Error::operation("message_ack", "connection lost"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<Settled> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Settle for RecordingMessage {
        async fn ack(&self) -> gridfill_nats::Result<()> {
            self.record(Settled::Ack)
        }

        async fn nack(&self, delay: Option<Duration>) -> gridfill_nats::Result<()> {
            self.record(Settled::Nack(delay))
        }

        async fn term(&self) -> gridfill_nats::Result<()> {
            self.record(Settled::Term)
        }
    }

    fn cell(value: &str) -> anyhow::Result<JobEntry> {
        Ok(JobEntry::Cell {
            batch_id: "0123456789abcdef".parse()?,
            row: 1,
            col: 2,
            value: value.into(),
        })
    }

    fn processor(backend: &MemoryBackend) -> JobProcessor {
        JobProcessor::new(
            backend.storage(),
            MockProvider::new("insight").failing_on("broken").into_service(),
        )
    }

    async fn settle(
        processor: &JobProcessor,
        job: &JobEntry,
        delivery_count: u64,
    ) -> (JobOutcome, Vec<Settled>) {
        let message = RecordingMessage::default();
        let outcome = settle_job(processor, job, delivery_count, &message).await;
        (outcome, message.calls())
    }

    #[tokio::test]
    async fn test_finished_outcomes_are_acked() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let default = processor(&backend);
        let recording = processor(&backend).with_record_failures(true);

        let cases = [
            (&default, cell("a")?, JobOutcome::Completed),
            (&default, cell("broken")?, JobOutcome::Failed),
            (&recording, cell("broken")?, JobOutcome::FailureRecorded),
        ];

        for (processor, job, expected) in cases {
            let (outcome, calls) = settle(processor, &job, 1).await;
            assert_eq!(outcome, expected);
            assert_eq!(calls, vec![Settled::Ack]);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_retrying_is_redelivered_after_delay() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let retrying = processor(&backend).with_retry_failures(true, 3);
        let job = cell("broken")?;

        let (outcome, calls) = settle(&retrying, &job, 1).await;
        assert_eq!(outcome, JobOutcome::Retrying);
        assert_eq!(calls, vec![Settled::Nack(Some(REDELIVERY_DELAY))]);

        let (outcome, calls) = settle(&retrying, &job, 3).await;
        assert_eq!(outcome, JobOutcome::Failed);
        assert_eq!(calls, vec![Settled::Ack]);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_redelivered_after_delay() -> anyhow::Result<()> {
        let backend = MemoryBackend::new().rejecting_results();

        let (outcome, calls) = settle(&processor(&backend), &cell("a")?, 1).await;

        assert_eq!(outcome, JobOutcome::StoreFailed);
        assert_eq!(calls, vec![Settled::Nack(Some(REDELIVERY_DELAY))]);
        assert_eq!(backend.result_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ack_keeps_written_result() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let job = cell("a")?;
        let message = RecordingMessage::failing();

        let outcome = settle_job(&processor(&backend), &job, 1, &message).await;

        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(message.calls(), vec![Settled::Ack]);
        assert!(backend.result(&job.result_key()).is_some());
        Ok(())
    }
}
