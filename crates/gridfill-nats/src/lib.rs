#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "gridfill_nats::client";

/// Tracing target for NATS key-value store operations.
///
/// Use this target for logging result and batch bucket operations.
pub const TRACING_TARGET_KV: &str = "gridfill_nats::kv";

/// Tracing target for NATS JetStream operations.
///
/// Use this target for logging job log appends, consumer group setup, and deliveries.
pub const TRACING_TARGET_STREAM: &str = "gridfill_nats::stream";

/// Tracing target for NATS connection operations.
pub const TRACING_TARGET_CONNECTION: &str = "gridfill_nats::connection";

mod client;
mod error;
pub mod kv;
pub mod stream;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
