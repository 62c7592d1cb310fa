//! Result record written for each processed cell.

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Status tag of a result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultStatus {
    /// The completion returned generated text.
    Completed,
    /// The completion failed; only written when failure recording is enabled.
    Failed,
}

/// Outcome of processing one job entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ResultRecord {
    /// Generated text, or the error message for failed records.
    pub result: String,
    /// Upstream trace token, may be empty.
    pub trace_id: String,
    /// Status tag.
    pub status: ResultStatus,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

impl ResultRecord {
    /// Creates a completed record stamped with the current time.
    pub fn completed(result: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            trace_id: trace_id.into(),
            status: ResultStatus::Completed,
            timestamp: Timestamp::now().as_second(),
        }
    }

    /// Creates a failed record carrying the error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: error.into(),
            trace_id: String::new(),
            status: ResultStatus::Failed,
            timestamp: Timestamp::now().as_second(),
        }
    }

    /// Returns true if the record holds generated text.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == ResultStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_record_wire_shape() -> anyhow::Result<()> {
        let record = ResultRecord::completed("France", "trace-1");
        let json = serde_json::to_value(&record)?;

        assert_eq!(json["result"], "France");
        assert_eq!(json["trace_id"], "trace-1");
        assert_eq!(json["status"], "completed");
        assert!(json["timestamp"].as_i64().is_some_and(|ts| ts > 0));
        Ok(())
    }

    #[test]
    fn test_failed_record() {
        let record = ResultRecord::failed("upstream returned 502");
        assert!(!record.is_completed());
        assert_eq!(record.status.as_ref(), "failed");
        assert!(record.trace_id.is_empty());
    }
}
