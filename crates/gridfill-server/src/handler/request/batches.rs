//! Batch submission request types.

use gridfill_nats::kv::BatchShape;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for submitting a spreadsheet table.
///
/// Row 0 holds column headers and columns 0 and 1 hold row labels; every
/// other cell becomes one job.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTable {
    /// Table rows; rows may differ in length.
    #[validate(length(min = 1))]
    pub table: Vec<Vec<String>>,
}

impl SubmitTable {
    /// Converts this request into a batch shape.
    #[inline]
    pub fn into_shape(self) -> BatchShape {
        BatchShape::Table { table: self.table }
    }
}

/// Request payload for submitting an autofill batch.
///
/// Every `(row, col)` pair of the two label lists becomes one job.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAutofill {
    /// Item labels, one per output row.
    #[validate(length(min = 1))]
    pub rows: Vec<String>,
    /// Attribute labels, one per output column.
    #[validate(length(min = 1))]
    pub cols: Vec<String>,
}

impl SubmitAutofill {
    /// Converts this request into a batch shape.
    #[inline]
    pub fn into_shape(self) -> BatchShape {
        BatchShape::Labels {
            rows: self.rows,
            cols: self.cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_requests_fail_validation() {
        assert!(SubmitTable::default().validate().is_err());
        assert!(
            SubmitAutofill {
                rows: vec!["Paris".into()],
                cols: vec![],
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_autofill_into_shape() {
        let request = SubmitAutofill {
            rows: vec!["Paris".into()],
            cols: vec!["Country".into()],
        };
        assert!(request.validate().is_ok());
        assert!(matches!(request.into_shape(), BatchShape::Labels { .. }));
    }
}
