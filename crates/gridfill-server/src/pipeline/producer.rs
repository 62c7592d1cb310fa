//! Fan-out of submitted batches into job log entries.

use gridfill_nats::kv::{BatchKey, BatchRecord, BatchShape};
use gridfill_nats::stream::JobEntry;

use crate::service::BatchStorage;

/// Tracing target for the job producer.
const TRACING_TARGET: &str = "gridfill_server::pipeline::producer";

/// Prefix of autofill batch ids.
pub const AUTOFILL_PREFIX: &str = "autofill_";

/// Number of random bytes in a batch id.
const BATCH_ID_BYTES: usize = 8;

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Id of the new batch.
    pub batch_id: BatchKey,
    /// Number of jobs appended to the log.
    pub job_count: usize,
}

/// Errors raised while submitting a batch.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The batch has no cells.
    #[error("batch has no cells to process")]
    EmptyBatch,

    /// A generated batch id was rejected by the key rules.
    #[error("generated batch id is invalid")]
    InvalidId(#[source] gridfill_nats::Error),

    /// Batch metadata could not be stored; no job was appended.
    #[error("failed to store batch metadata")]
    Metadata(#[source] gridfill_nats::Error),

    /// Appending failed partway; earlier jobs stay queued.
    #[error("queued {queued} of {total} jobs before failing")]
    Partial {
        batch_id: BatchKey,
        queued: usize,
        total: usize,
        #[source]
        source: gridfill_nats::Error,
    },
}

/// Turns batch shapes into job entries on the job log.
#[derive(Debug, Clone)]
pub struct JobProducer {
    storage: BatchStorage,
}

impl JobProducer {
    /// Creates a producer writing through the given storage.
    pub fn new(storage: BatchStorage) -> Self {
        Self { storage }
    }

    /// Stores the batch shape, then appends one job per cell.
    ///
    /// Returns without waiting for any job to be processed. Jobs appended
    /// before a failure are not rolled back.
    #[tracing::instrument(skip_all, target = TRACING_TARGET)]
    pub async fn submit(&self, shape: BatchShape) -> Result<Submission, SubmitError> {
        if shape.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        let batch_id = match &shape {
            BatchShape::Table { .. } => new_batch_id(),
            BatchShape::Labels { .. } => new_autofill_id(),
        }
        .map_err(SubmitError::InvalidId)?;
        let jobs = plan_jobs(&batch_id, &shape);

        self.storage
            .put_batch(&batch_id, &BatchRecord::new(shape))
            .await
            .map_err(SubmitError::Metadata)?;

        let total = jobs.len();
        for (queued, job) in jobs.iter().enumerate() {
            if let Err(source) = self.storage.append_job(job).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    batch_id = %batch_id,
                    queued,
                    total,
                    error = %source,
                    "Job append failed"
                );
                return Err(SubmitError::Partial {
                    batch_id,
                    queued,
                    total,
                    source,
                });
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            batch_id = %batch_id,
            job_count = total,
            "Batch submitted"
        );

        Ok(Submission {
            batch_id,
            job_count: total,
        })
    }
}

/// Returns the jobs for a batch shape in row-major order.
pub fn plan_jobs(batch_id: &BatchKey, shape: &BatchShape) -> Vec<JobEntry> {
    match shape {
        BatchShape::Table { table } => table_jobs(batch_id, table),
        BatchShape::Labels { rows, cols } => label_jobs(batch_id, rows, cols),
    }
}

/// Returns one cell job per value outside row 0 and columns 0 and 1.
///
/// Ragged rows are walked by their own length.
pub fn table_jobs(batch_id: &BatchKey, table: &[Vec<String>]) -> Vec<JobEntry> {
    table
        .iter()
        .enumerate()
        .skip(1)
        .flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .skip(2)
                .map(move |(col, value)| JobEntry::Cell {
                    batch_id: batch_id.clone(),
                    row,
                    col,
                    value: value.clone(),
                })
        })
        .collect()
}

/// Returns one label job per `(row, col)` pair of the cross product.
pub fn label_jobs(batch_id: &BatchKey, rows: &[String], cols: &[String]) -> Vec<JobEntry> {
    rows.iter()
        .enumerate()
        .flat_map(|(row, row_label)| {
            cols.iter()
                .enumerate()
                .map(move |(col, col_label)| JobEntry::Label {
                    batch_id: batch_id.clone(),
                    row,
                    col,
                    row_label: row_label.clone(),
                    col_label: col_label.clone(),
                })
        })
        .collect()
}

/// Generates a table batch id: 8 random bytes, hex encoded.
pub fn new_batch_id() -> gridfill_nats::Result<BatchKey> {
    random_hex().parse()
}

/// Generates an autofill batch id: `autofill_` followed by a hex id.
pub fn new_autofill_id() -> gridfill_nats::Result<BatchKey> {
    format!("{AUTOFILL_PREFIX}{}", random_hex()).parse()
}

/// Returns true if `batch_id` was issued for an autofill batch.
#[inline]
pub fn is_autofill_id(batch_id: &str) -> bool {
    batch_id.starts_with(AUTOFILL_PREFIX)
}

fn random_hex() -> String {
    hex::encode(rand::random::<[u8; BATCH_ID_BYTES]>())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::service::MemoryBackend;

    fn batch() -> BatchKey {
        "0123456789abcdef".parse().unwrap()
    }

    fn table(rows: usize, cols: usize) -> Vec<Vec<String>> {
        (0..rows)
            .map(|r| (0..cols).map(|c| format!("{r}-{c}")).collect())
            .collect()
    }

    #[test]
    fn test_table_jobs_cover_inner_cells() {
        for (rows, cols) in [(2, 2), (2, 3), (3, 5), (6, 4)] {
            let jobs = table_jobs(&batch(), &table(rows, cols));
            assert_eq!(jobs.len(), (rows - 1) * (cols - 2));

            for job in &jobs {
                let (row, col) = job.position();
                assert!((1..rows).contains(&row));
                assert!((2..cols).contains(&col));
            }
        }
    }

    #[tokio::test]
    async fn test_header_only_table_queues_nothing() -> anyhow::Result<()> {
        for cols in [1_usize, 2, 3, 5] {
            let expected = (1_usize - 1) * cols.saturating_sub(2);
            assert_eq!(table_jobs(&batch(), &table(1, cols)).len(), expected);
        }

        let backend = MemoryBackend::new();
        let producer = JobProducer::new(backend.storage());
        let shape = BatchShape::Table { table: table(1, 3) };
        let submission = producer.submit(shape.clone()).await?;

        assert_eq!(submission.job_count, 0);
        assert!(backend.jobs().is_empty());
        let stored = backend.storage().get_batch(&submission.batch_id).await?;
        assert_eq!(stored.map(|record| record.shape), Some(shape));
        Ok(())
    }

    #[test]
    fn test_table_jobs_are_row_major() {
        let jobs = table_jobs(&batch(), &table(3, 4));
        let positions: Vec<_> = jobs.iter().map(JobEntry::position).collect();
        assert_eq!(positions, vec![(1, 2), (1, 3), (2, 2), (2, 3)]);
    }

    #[test]
    fn test_table_jobs_walk_ragged_rows() {
        let table = vec![
            vec!["".into(), "C1".into(), "C2".into()],
            vec!["R1".into(), "a".into(), "b".into(), "extra".into()],
            vec!["R2".into()],
        ];
        let jobs = table_jobs(&batch(), &table);
        let positions: Vec<_> = jobs.iter().map(JobEntry::position).collect();
        assert_eq!(positions, vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn test_label_jobs_cover_cross_product() {
        let rows: Vec<String> = (0..3).map(|i| format!("row{i}")).collect();
        let cols: Vec<String> = (0..4).map(|i| format!("col{i}")).collect();

        let jobs = label_jobs(&batch(), &rows, &cols);
        assert_eq!(jobs.len(), 12);

        let distinct: HashSet<_> = jobs.iter().map(JobEntry::position).collect();
        assert_eq!(distinct.len(), 12);
    }

    #[test]
    fn test_batch_ids() -> anyhow::Result<()> {
        let id = new_batch_id()?;
        assert_eq!(id.as_str().len(), BATCH_ID_BYTES * 2);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));

        let autofill = new_autofill_id()?;
        assert!(is_autofill_id(autofill.as_str()));
        assert!(!is_autofill_id(new_batch_id()?.as_str()));
        assert_ne!(new_batch_id()?, new_batch_id()?);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_stores_metadata_and_jobs() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let producer = JobProducer::new(backend.storage());

        let shape = BatchShape::Table { table: table(3, 4) };
        let submission = producer.submit(shape.clone()).await?;

        assert_eq!(submission.job_count, 4);
        assert_eq!(backend.jobs().len(), 4);

        let stored = backend.storage().get_batch(&submission.batch_id).await?;
        assert_eq!(stored.map(|record| record.shape), Some(shape));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_batch() {
        let producer = JobProducer::new(MemoryBackend::new().storage());

        let result = producer.submit(BatchShape::Table { table: vec![] }).await;
        assert!(matches!(result, Err(SubmitError::EmptyBatch)));

        let result = producer
            .submit(BatchShape::Labels {
                rows: vec!["Paris".into()],
                cols: vec![],
            })
            .await;
        assert!(matches!(result, Err(SubmitError::EmptyBatch)));
    }

    #[tokio::test]
    async fn test_submit_reports_partial_failure() {
        let backend = MemoryBackend::new().with_append_limit(2);
        let producer = JobProducer::new(backend.storage());

        let result = producer
            .submit(BatchShape::Table { table: table(3, 5) })
            .await;

        match result {
            Err(SubmitError::Partial { queued, total, .. }) => {
                assert_eq!(queued, 2);
                assert_eq!(total, 6);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(backend.jobs().len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failure_appends_nothing() {
        let backend = MemoryBackend::new().rejecting_batches();
        let producer = JobProducer::new(backend.storage());

        let result = producer
            .submit(BatchShape::Labels {
                rows: vec!["Paris".into()],
                cols: vec!["Country".into()],
            })
            .await;

        assert!(matches!(result, Err(SubmitError::Metadata(_))));
        assert!(backend.jobs().is_empty());
    }
}
