//! Batch job pipeline.
//!
//! ## Architecture
//!
//! - [`JobProducer`] - Stores a batch and appends one job entry per cell
//! - [`JobProcessor`] - Completes one job entry and writes its result record
//! - [`Worker`] - Claims entries from the consumer group with bounded concurrency
//! - [`WorkerHandles`] - Spawns the worker and coordinates its shutdown
//! - [`collect_results`] - Reads the recorded results of a batch

/// Tracing target for pipeline events.
const TRACING_TARGET: &str = "gridfill_server::pipeline";

mod processor;
mod producer;
mod prompt;
mod state;
mod status;
mod worker;

pub use processor::{DEFAULT_COMPLETION_TIMEOUT, JobOutcome, JobProcessor};
pub use producer::{
    AUTOFILL_PREFIX, JobProducer, SubmitError, Submission, is_autofill_id, label_jobs,
    new_autofill_id, new_batch_id, plan_jobs, table_jobs,
};
pub use prompt::{CELL_TEMPLATE, LABEL_TEMPLATE, prompt_for};
pub use state::{
    DEFAULT_COMPLETION_TIMEOUT_SECS, DEFAULT_FETCH_BATCH, DEFAULT_FETCH_WAIT_SECS,
    DEFAULT_MAX_CONCURRENT_JOBS, PipelineConfig, PipelineState,
};
pub use status::collect_results;
use gridfill_nats::stream::JobSubscriber;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
pub use worker::Worker;

use crate::{Error, Result};

/// Handle for the background worker.
///
/// Holds the join handle of the spawned worker for graceful shutdown.
pub struct WorkerHandles {
    worker: JoinHandle<Result<()>>,
    cancel_token: CancellationToken,
}

impl WorkerHandles {
    /// Spawns the worker on a joined consumer group.
    ///
    /// The worker gets a consumer name in the format `worker-{hex}` for
    /// logging; delivery state is shared through the group.
    pub fn spawn(state: &PipelineState, subscriber: JobSubscriber) -> Self {
        let cancel_token = CancellationToken::new();
        let instance_id = hex::encode(rand::random::<[u8; 4]>());
        let semaphore = state.config.create_semaphore();

        tracing::info!(
            target: TRACING_TARGET,
            instance_id = %instance_id,
            max_concurrent_jobs = state.config.max_concurrent_jobs,
            "Starting cell worker"
        );

        let worker = Worker::new(
            state.clone(),
            subscriber,
            format!("worker-{instance_id}"),
            cancel_token.clone(),
            semaphore,
        )
        .spawn();

        Self {
            worker,
            cancel_token,
        }
    }

    /// Requests graceful shutdown.
    ///
    /// The worker stops claiming entries and finishes the jobs it holds.
    pub fn shutdown(&self) {
        tracing::info!(
            target: TRACING_TARGET,
            "Initiating graceful shutdown of cell worker"
        );
        self.cancel_token.cancel();
    }

    /// Waits for the worker to complete.
    pub async fn wait(self) -> Result<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            "Waiting for cell worker to complete"
        );

        self.worker
            .await
            .map_err(|e| Error::internal("pipeline", e.to_string()))??;

        tracing::info!(target: TRACING_TARGET, "Cell worker stopped");
        Ok(())
    }
}
