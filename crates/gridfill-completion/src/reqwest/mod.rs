//! Reqwest-based HTTP completion clients.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridfill_completion::reqwest::{ChainRunnerClient, CompletionConfig};
//! use gridfill_completion::CompletionService;
//!
//! // Build whichever backend the configuration selects
//! let service: CompletionService = CompletionConfig::default().into_service()?;
//! ```

mod chain_runner;
mod config;
mod error;
mod openai;

pub use chain_runner::ChainRunnerClient;
pub use config::{CompletionConfig, ProviderKind, ReqwestConfig};
pub use error::{Error, Result};
pub use openai::OpenAiClient;

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "gridfill_completion::reqwest";
