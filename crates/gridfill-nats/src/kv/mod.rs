//! NATS Key-Value stores for batch shapes and cell results.
//!
//! This module provides type-safe abstractions over NATS KV:
//! - `KvStore<K, V, B>`: Generic type-safe key-value operations
//! - `KvKey`: Trait for key types
//! - `KvBucket`: Trait for bucket configuration
//!
//! # Example
//!
//! ```ignore
//! let results: ResultStore = nats_client.result_store().await?;
//!
//! let key = ResultKey::new(batch_id.clone(), 1, 2);
//! results.put(&key, &ResultRecord::completed("Paris", "trace-1")).await?;
//!
//! let partial = results.batch_results(&batch_id).await?;
//! ```

mod batch_record;
mod kv_bucket;
mod kv_key;
mod kv_store;
mod result_record;

pub use batch_record::{BatchRecord, BatchShape};
pub use kv_bucket::{BatchesBucket, KvBucket, ResultsBucket};
pub use kv_key::{BatchKey, KvKey, ResultKey};
pub use kv_store::{BatchStore, KvStore, ResultStore};
pub use result_record::{ResultRecord, ResultStatus};
