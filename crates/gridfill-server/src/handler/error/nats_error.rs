//! Broker error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for broker error conversions.
const TRACING_TARGET: &str = "gridfill_server::handler::nats";

impl From<gridfill_nats::Error> for HttpError<'static> {
    fn from(error: gridfill_nats::Error) -> Self {
        use gridfill_nats::Error as NatsError;

        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            "Broker operation failed"
        );

        match error {
            NatsError::Connection(_) => ErrorKind::ServiceUnavailable
                .with_message("Message broker unavailable")
                .with_context(error.to_string()),

            NatsError::Timeout { .. } => ErrorKind::GatewayTimeout
                .with_message("Message broker did not respond in time")
                .with_context(error.to_string()),

            NatsError::InvalidKey { ref key, .. } => ErrorKind::BadRequest
                .with_message("Invalid batch id")
                .with_resource("batch")
                .with_context(format!("Rejected key '{key}'")),

            NatsError::DeliveryFailed { ref subject, .. } => ErrorKind::InternalServerError
                .with_message("Failed to queue job")
                .with_context(format!("Publish to '{subject}' failed: {error}")),

            NatsError::Serialization(_)
            | NatsError::StreamError { .. }
            | NatsError::ConsumerError { .. }
            | NatsError::InvalidConfig { .. }
            | NatsError::Operation { .. } => ErrorKind::InternalServerError
                .with_message("Storage operation failed")
                .with_context(error.to_string()),
        }
    }
}
