//! Batch response types.

use std::collections::BTreeMap;

use gridfill_nats::kv::{BatchRecord, BatchShape};
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pipeline::Submission;

/// State of a submission when the response is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Every job was queued; results arrive as workers finish.
    Accepted,
}

/// Response returned after a table batch is queued.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchAccepted {
    /// Id to poll for results.
    pub batch_id: String,
    /// Number of cells queued for processing.
    pub job_count: usize,
    /// Submission status.
    pub status: SubmissionStatus,
}

impl From<Submission> for BatchAccepted {
    fn from(submission: Submission) -> Self {
        Self {
            batch_id: submission.batch_id.to_string(),
            job_count: submission.job_count,
            status: SubmissionStatus::Accepted,
        }
    }
}

/// Response returned after an autofill batch is queued.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutofillAccepted {
    /// Id to poll for results.
    pub autofill_id: String,
    /// Number of label pairs queued for processing.
    pub job_count: usize,
    /// Submission status.
    pub status: SubmissionStatus,
}

impl From<Submission> for AutofillAccepted {
    fn from(submission: Submission) -> Self {
        Self {
            autofill_id: submission.batch_id.to_string(),
            job_count: submission.job_count,
            status: SubmissionStatus::Accepted,
        }
    }
}

/// Results recorded so far for a batch.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResults {
    /// JSON-encoded result records keyed by `"{row}:{col}"`.
    pub results: BTreeMap<String, String>,
}

/// Stored input of a table batch.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredTable {
    /// Batch id.
    pub batch_id: String,
    /// Submitted table.
    pub table: Vec<Vec<String>>,
    /// Submission time.
    pub created_at: Timestamp,
}

impl StoredTable {
    /// Returns the stored table, or `None` for an autofill record.
    pub fn from_record(batch_id: String, record: BatchRecord) -> Option<Self> {
        match record.shape {
            BatchShape::Table { table } => Some(Self {
                batch_id,
                table,
                created_at: record.created_at,
            }),
            BatchShape::Labels { .. } => None,
        }
    }
}

/// Stored input of an autofill batch.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredAutofill {
    /// Autofill batch id.
    pub autofill_id: String,
    /// Submitted row labels.
    pub rows: Vec<String>,
    /// Submitted column labels.
    pub cols: Vec<String>,
    /// Submission time.
    pub created_at: Timestamp,
}

impl StoredAutofill {
    /// Returns the stored labels, or `None` for a table record.
    pub fn from_record(autofill_id: String, record: BatchRecord) -> Option<Self> {
        match record.shape {
            BatchShape::Labels { rows, cols } => Some(Self {
                autofill_id,
                rows,
                cols,
                created_at: record.created_at,
            }),
            BatchShape::Table { .. } => None,
        }
    }
}
