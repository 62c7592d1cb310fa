//! [`Error`], [`ErrorKind`] and [`Result`].

mod http_error;
mod nats_error;
mod service_error;
mod submit_error;

pub use http_error::{Error, ErrorKind, Result};
