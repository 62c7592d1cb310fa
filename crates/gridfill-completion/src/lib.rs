#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod service;

pub mod request;
pub mod response;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

#[cfg(feature = "test-utils")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
mod mock;

pub use error::{BoxedError, Error, ErrorKind, Result};
#[cfg(feature = "test-utils")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use mock::MockProvider;
pub use request::{CompletionRequest, Prompt};
pub use response::CompletionResponse;
pub use service::CompletionService;

/// Tracing target for completion operations.
pub const TRACING_TARGET: &str = "gridfill_completion";

/// Core trait for text completion backends.
///
/// Implement this trait to plug a new text-generation service into the
/// worker. Implementations make a single attempt per call.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Generates text for the given prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
