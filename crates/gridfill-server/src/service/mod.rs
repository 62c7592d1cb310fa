//! Application state and dependency injection.

#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod service_config;
mod service_state;
mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub use crate::service::memory::MemoryBackend;
pub use crate::service::service_config::{ServiceConfig, ServiceConfigBuilder};
pub use crate::service::service_state::ServiceState;
pub use crate::service::storage::{BatchBackend, BatchStorage, NatsBackend};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};
