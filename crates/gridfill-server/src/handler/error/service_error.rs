//! Service layer error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for service error conversions.
const TRACING_TARGET: &str = "gridfill_server::handler::service";

impl From<crate::Error> for HttpError<'static> {
    fn from(error: crate::Error) -> Self {
        use crate::ErrorKind as ServiceErrorKind;

        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            error_kind = %error.kind(),
            "Service operation failed"
        );

        match error.kind() {
            ServiceErrorKind::Config => ErrorKind::InternalServerError
                .with_message("Service misconfigured")
                .with_context(error.to_string()),
            ServiceErrorKind::External => ErrorKind::ServiceUnavailable
                .with_message("Upstream service failed")
                .with_context(error.to_string()),
            ServiceErrorKind::Internal => ErrorKind::InternalServerError
                .with_context(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_are_server_errors() {
        let error: HttpError = crate::Error::internal("status", "encode failed").into();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        assert_eq!(error.context(), Some("status: encode failed"));

        let error: HttpError = crate::Error::external("nats", "down").into();
        assert!(error.kind().status_code().is_server_error());
    }
}
