//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Recovery (panics, request timeouts)
//! - Observability (request ids, tracing spans)
//! - Security (CORS, body limits, response headers)
//! - OpenAPI documentation with Scalar UI
//!
//! # Usage
//!
//! ```rust,ignore
//! let app = api_routes
//!     .with_security(&CorsConfig::default())
//!     .with_observability()
//!     .with_recovery(&RecoveryConfig::default());
//! ```

mod observability;
mod recovery;
mod security;
mod specification;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, RouterSecurityExt};
pub use specification::{OpenApiConfig, RouterOpenApiExt};
