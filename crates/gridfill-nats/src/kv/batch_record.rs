//! Stored shape of a submitted batch.

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input shape of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchShape {
    /// Raw spreadsheet table; row 0 and columns 0-1 hold labels.
    Table { table: Vec<Vec<String>> },
    /// Row and column labels whose cross product defines the cells.
    Labels { rows: Vec<String>, cols: Vec<String> },
}

impl BatchShape {
    /// Returns true if the shape holds no cells to process.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Table { table } => table.is_empty(),
            Self::Labels { rows, cols } => rows.is_empty() || cols.is_empty(),
        }
    }
}

/// Batch metadata persisted before any job is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct BatchRecord {
    /// Submitted shape of the batch.
    #[serde(flatten)]
    pub shape: BatchShape,
    /// Submission time.
    pub created_at: Timestamp,
}

impl BatchRecord {
    /// Creates a record stamped with the current time.
    pub fn new(shape: BatchShape) -> Self {
        Self {
            shape,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_is_empty() {
        assert!(BatchShape::Table { table: vec![] }.is_empty());
        assert!(
            BatchShape::Labels {
                rows: vec!["Paris".into()],
                cols: vec![],
            }
            .is_empty()
        );
        assert!(
            !BatchShape::Labels {
                rows: vec!["Paris".into()],
                cols: vec!["Country".into()],
            }
            .is_empty()
        );
    }

    #[test]
    fn test_record_is_tagged_by_kind() -> anyhow::Result<()> {
        let record = BatchRecord::new(BatchShape::Labels {
            rows: vec!["Paris".into()],
            cols: vec!["Country".into()],
        });

        let json = serde_json::to_value(&record)?;
        assert_eq!(json["kind"], "labels");
        assert_eq!(json["rows"][0], "Paris");

        let parsed: BatchRecord = serde_json::from_value(json)?;
        assert_eq!(parsed, record);
        Ok(())
    }
}
