//! Error types for reqwest-based completion clients.

use thiserror::Error;

/// Result type alias for reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// Upstream returned a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    crate::Error::timeout()
                        .with_message(e.to_string())
                        .with_source(e)
                } else if e.is_connect() {
                    crate::Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    crate::Error::invalid_response()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    crate::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Serde(e) => crate::Error::invalid_response()
                .with_message(e.to_string())
                .with_source(e),
            Error::Url(e) => crate::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
            Error::Status { .. } => crate::Error::external_error().with_message(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_status_maps_to_external_error() {
        let err: crate::Error = Error::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ExternalError);
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_malformed_body_maps_to_invalid_response() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: crate::Error = Error::Serde(serde_err).into();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }
}
