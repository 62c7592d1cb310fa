//! All `aide::axum::`[`ApiRouter`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use axum::Router;
//! use gridfill_server::handler::routes;
//! use gridfill_server::middleware::{OpenApiConfig, RouterOpenApiExt};
//!
//! let app: Router = routes()
//!     .with_open_api(OpenApiConfig::default())
//!     .with_state(state);
//! ```
//!
//! [`ApiRouter`]: aide::axum::ApiRouter
//! [`Handler`]: axum::handler::Handler

mod autofill;
mod batches;
mod error;
mod monitors;
pub mod request;
pub mod response;

use aide::axum::ApiRouter;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all routes.
///
/// Unknown paths answer with a JSON `404`.
pub fn routes() -> ApiRouter<ServiceState> {
    ApiRouter::new()
        .merge(batches::routes())
        .merge(autofill::routes())
        .merge(monitors::routes())
        .fallback(handler)
}
