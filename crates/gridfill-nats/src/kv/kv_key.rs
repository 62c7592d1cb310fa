//! Key-value key types and traits.

use std::fmt;
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Marker trait for KV key types.
///
/// This trait defines how keys are formatted for storage in NATS KV.
pub trait KvKey: fmt::Debug + fmt::Display + FromStr + Clone + Send + Sync + 'static {}

/// Identifier of a submitted batch.
///
/// Batch ids are used as a single NATS subject token, so they are restricted
/// to ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchKey(String);

impl KvKey for BatchKey {}

impl BatchKey {
    /// Maximum accepted identifier length.
    pub const MAX_LEN: usize = 128;

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BatchKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::invalid_key(s, "batch id cannot be empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(Error::invalid_key(s, "batch id is too long"));
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(Error::invalid_key(s, "batch id contains invalid characters"));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for BatchKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BatchKey> for String {
    fn from(key: BatchKey) -> Self {
        key.0
    }
}

/// Key of a single cell result: `{batch_id}.{row}.{col}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub batch_id: BatchKey,
    pub row: usize,
    pub col: usize,
}

impl KvKey for ResultKey {}

impl ResultKey {
    /// Creates a key for the given batch and zero-based coordinate.
    pub fn new(batch_id: BatchKey, row: usize, col: usize) -> Self {
        Self { batch_id, row, col }
    }

    /// Returns the wire form of the coordinate, `"{row}:{col}"`.
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.row, self.col)
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.batch_id, self.row, self.col)
    }
}

impl FromStr for ResultKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let (Some(batch), Some(row), Some(col), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::invalid_key(s, "expected batch.row.col"));
        };

        let row = row
            .parse()
            .map_err(|_| Error::invalid_key(s, "row is not a number"))?;
        let col = col
            .parse()
            .map_err(|_| Error::invalid_key(s, "col is not a number"))?;

        Ok(Self {
            batch_id: batch.parse()?,
            row,
            col,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_key_accepts_hex_and_prefixed_ids() {
        assert!("9f86d081884c7d65".parse::<BatchKey>().is_ok());
        assert!("autofill_9f86d081884c7d65".parse::<BatchKey>().is_ok());
    }

    #[test]
    fn test_batch_key_rejects_subject_tokens() {
        assert!("".parse::<BatchKey>().is_err());
        assert!("abc.def".parse::<BatchKey>().is_err());
        assert!(">".parse::<BatchKey>().is_err());
        assert!("a*".parse::<BatchKey>().is_err());
        assert!("a b".parse::<BatchKey>().is_err());
    }

    #[test]
    fn test_result_key_format() {
        let batch: BatchKey = "abc123".parse().unwrap();
        let key = ResultKey::new(batch, 1, 2);
        assert_eq!(key.to_string(), "abc123.1.2");
        assert_eq!(key.coordinate(), "1:2");
        assert_eq!("abc123.1.2".parse::<ResultKey>().unwrap(), key);
    }

    #[test]
    fn test_result_key_rejects_malformed() {
        assert!("abc123.1".parse::<ResultKey>().is_err());
        assert!("abc123.1.2.3".parse::<ResultKey>().is_err());
        assert!("abc123.x.2".parse::<ResultKey>().is_err());
    }

    #[test]
    fn test_batch_key_serde() {
        let key: BatchKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(key.as_str(), "abc");
        assert!(serde_json::from_str::<BatchKey>("\"a.b\"").is_err());
    }
}
