//! Errors raised outside of request handlers.
//!
//! Covers wiring the service together at startup, the worker task, and
//! reads that handlers delegate to the storage layer.

use std::borrow::Cow;
use std::error::Error as StdError;

use strum::{AsRefStr, Display};

/// Boxed error source that can move across tasks.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for service operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse category of an [`Error`], used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid settings, found before anything is served.
    Config,
    /// The broker or the completion backend failed.
    External,
    /// A bug or an unexpected state inside this crate.
    Internal,
}

/// Service error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings were rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(Cow<'static, str>),

    /// A dependency failed.
    #[error("{service}: {message}")]
    External {
        service: Cow<'static, str>,
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },

    /// Something inside the crate went wrong.
    #[error("{component}: {message}")]
    Internal {
        component: Cow<'static, str>,
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },
}

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an error for a failed dependency.
    pub fn external(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::External {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error for a failure inside `component`.
    pub fn internal(
        component: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Internal {
            component: component.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying error. Configuration errors carry no source.
    #[must_use]
    pub fn with_source(mut self, error: impl StdError + Send + Sync + 'static) -> Self {
        match &mut self {
            Self::Config(_) => {}
            Self::External { source, .. } | Self::Internal { source, .. } => {
                *source = Some(Box::new(error));
            }
        }
        self
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::External { .. } => ErrorKind::External,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<gridfill_nats::Error> for Error {
    fn from(err: gridfill_nats::Error) -> Self {
        Error::external("nats", err.to_string()).with_source(err)
    }
}

impl From<gridfill_completion::Error> for Error {
    fn from(err: gridfill_completion::Error) -> Self {
        Error::external("completion", err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_has_no_source() {
        let error = Error::config("Fetch batch must be at least 1")
            .with_source(std::io::Error::other("ignored"));

        assert_eq!(error.kind(), ErrorKind::Config);
        assert_eq!(
            error.to_string(),
            "invalid configuration: Fetch batch must be at least 1"
        );
        assert!(StdError::source(&error).is_none());
    }

    #[test]
    fn test_from_nats_error_keeps_source() {
        let error: Error = gridfill_nats::Error::invalid_config("bad url").into();

        assert_eq!(error.kind(), ErrorKind::External);
        assert!(error.to_string().starts_with("nats: "));
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_from_completion_error() {
        let error: Error = gridfill_completion::Error::timeout().into();

        assert_eq!(error.kind(), ErrorKind::External);
        assert!(error.to_string().starts_with("completion"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Config.as_ref(), "config");
        assert_eq!(ErrorKind::External.to_string(), "external");
        assert_eq!(Error::internal("status", "x").kind(), ErrorKind::Internal);
    }
}
