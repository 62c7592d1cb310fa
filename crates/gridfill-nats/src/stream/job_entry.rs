//! Job entries appended to the job log.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::kv::{BatchKey, ResultKey};

/// Discriminant of a [`JobEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    /// Raw spreadsheet cell value.
    Cell,
    /// Row and column label pair.
    Label,
}

/// One unit of work inside a batch.
///
/// Both payload shapes travel on the same stream and are told apart by the
/// `kind` field of the serialized entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobEntry {
    /// A table cell, analyzed from its raw value.
    Cell {
        batch_id: BatchKey,
        row: usize,
        col: usize,
        value: String,
    },
    /// A cross-product cell, answered from its labels.
    Label {
        batch_id: BatchKey,
        row: usize,
        col: usize,
        row_label: String,
        col_label: String,
    },
}

impl JobEntry {
    /// Returns the entry's discriminant.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Cell { .. } => JobKind::Cell,
            Self::Label { .. } => JobKind::Label,
        }
    }

    /// Returns the batch the entry belongs to.
    pub fn batch_id(&self) -> &BatchKey {
        match self {
            Self::Cell { batch_id, .. } | Self::Label { batch_id, .. } => batch_id,
        }
    }

    /// Returns the zero-based `(row, col)` coordinate.
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::Cell { row, col, .. } | Self::Label { row, col, .. } => (*row, *col),
        }
    }

    /// Returns the result store key for this entry's coordinate.
    pub fn result_key(&self) -> ResultKey {
        let (row, col) = self.position();
        ResultKey::new(self.batch_id().clone(), row, col)
    }

    /// Returns a stable id used for publish deduplication.
    pub fn message_id(&self) -> String {
        self.result_key().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> BatchKey {
        "abc123".parse().unwrap()
    }

    #[test]
    fn test_label_entry_is_tagged() -> anyhow::Result<()> {
        let entry = JobEntry::Label {
            batch_id: batch(),
            row: 1,
            col: 0,
            row_label: "Tokyo".into(),
            col_label: "Country".into(),
        };

        let json = serde_json::to_value(&entry)?;
        assert_eq!(json["kind"], "label");
        assert_eq!(json["batch_id"], "abc123");
        assert_eq!(entry.kind(), JobKind::Label);
        assert_eq!(entry.result_key().coordinate(), "1:0");
        Ok(())
    }

    #[test]
    fn test_cell_entry_decodes_by_kind() -> anyhow::Result<()> {
        let raw = r#"{"kind":"cell","batch_id":"abc123","row":1,"col":2,"value":"b"}"#;
        let entry: JobEntry = serde_json::from_str(raw)?;

        assert_eq!(entry.kind(), JobKind::Cell);
        assert_eq!(entry.position(), (1, 2));
        assert_eq!(entry.message_id(), "abc123.1.2");
        Ok(())
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"{"kind":"sheet","batch_id":"abc123","row":1,"col":2}"#;
        assert!(serde_json::from_str::<JobEntry>(raw).is_err());
    }
}
