//! HTTP request extractors with gridfill error responses.
//!
//! Drop-in replacements for the standard Axum extractors whose rejections
//! render as the same JSON [`ErrorResponse`] every handler returns.
//!
//! - [`Json`] - JSON body with sanitized deserialization errors
//! - [`ValidateJson`] - JSON body checked with `validator` rules
//! - [`Path`] - path parameters with a consistent 400 on bad input
//!
//! [`ErrorResponse`]: crate::handler::response::ErrorResponse

pub mod reject;

pub use crate::extract::reject::{Json, Path, ValidateJson};
