#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod service;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};

/// Tracing target for server-wide events.
pub const TRACING_TARGET_SERVER: &str = "gridfill_server";

/// Tracing target for batch storage access.
pub const TRACING_TARGET_STORAGE: &str = "gridfill_server::storage";
