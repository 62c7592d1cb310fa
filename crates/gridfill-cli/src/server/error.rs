//! Errors that end the process, with exit codes and recovery hints.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Failure that stops the server or the worker.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("Runtime error: {0}")]
    Runtime(#[source] io::Error),

    /// The cell worker stopped with an error.
    #[error("Worker error: {0}")]
    Worker(#[source] gridfill_server::Error),

    /// The cell worker did not drain before the shutdown timeout.
    #[error("Worker did not stop within {timeout_secs} seconds")]
    WorkerTimeout { timeout_secs: u64 },
}

impl ServerError {
    /// Creates a bind error with address context.
    pub fn bind_error(address: impl ToString, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_string(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::BindError { .. } => 2,
            Self::Runtime(_) => 3,
            Self::Worker(_) => 4,
            Self::WorkerTimeout { .. } => 5,
        }
    }

    /// Returns a human-readable hint for resolving this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BindError { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => {
                    Some("Try using a port above 1024 or run with appropriate privileges")
                }
                io::ErrorKind::AddrInUse => Some(
                    "The port is already in use. Try a different port or stop the conflicting service",
                ),
                io::ErrorKind::AddrNotAvailable => {
                    Some("The address is not available. Check network interface configuration")
                }
                _ => Some("Check network configuration and firewall settings"),
            },
            Self::Runtime(err) => match err.kind() {
                io::ErrorKind::ConnectionRefused => {
                    Some("Connection was refused, check if the service is running")
                }
                _ => None,
            },
            Self::Worker(_) => Some("Check that NATS is reachable and JetStream is enabled"),
            Self::WorkerTimeout { .. } => Some(
                "Unacknowledged jobs are redelivered after the ack wait; raise SHUTDOWN_TIMEOUT to drain them",
            ),
        }
    }
}
