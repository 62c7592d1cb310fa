//! Key-value bucket configuration traits.

use std::time::Duration;

/// Marker trait for KV bucket configuration.
///
/// This trait defines the configuration for a NATS KV bucket.
pub trait KvBucket: Clone + Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;

    /// Default TTL for entries in this bucket.
    /// Returns `None` for buckets where entries should not expire.
    const TTL: Option<Duration>;
}

/// Bucket for per-cell result records.
///
/// Entries never expire; retention is managed outside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResultsBucket;

impl KvBucket for ResultsBucket {
    const DESCRIPTION: &'static str = "Per-cell completion results";
    const NAME: &'static str = "cell_results";
    const TTL: Option<Duration> = None;
}

/// Bucket for submitted batch shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BatchesBucket;

impl KvBucket for BatchesBucket {
    const DESCRIPTION: &'static str = "Submitted batch shapes";
    const NAME: &'static str = "batches";
    const TTL: Option<Duration> = Some(Duration::from_secs(24 * 60 * 60)); // 24 hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_bucket() {
        assert_eq!(ResultsBucket::NAME, "cell_results");
        assert_eq!(ResultsBucket::TTL, None);
    }

    #[test]
    fn test_batches_bucket() {
        assert_eq!(BatchesBucket::NAME, "batches");
        assert_eq!(BatchesBucket::TTL, Some(Duration::from_secs(24 * 60 * 60)));
    }
}
