//! Event stream configuration for NATS JetStream.

use std::time::Duration;

use async_nats::jetstream::{self, stream};

use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Marker trait for event streams.
///
/// This trait defines the configuration for a NATS JetStream stream.
pub trait EventStream: Clone + Send + Sync + 'static {
    /// Stream name used in NATS JetStream.
    const NAME: &'static str;

    /// Subject pattern for publishing to this stream.
    const SUBJECT: &'static str;

    /// Maximum age for messages in this stream.
    /// Returns `None` for streams where messages should not expire.
    const MAX_AGE: Option<Duration>;

    /// Default consumer group name for this stream.
    const CONSUMER_NAME: &'static str;
}

/// Stream for cell completion jobs.
///
/// Messages expire after 7 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobStream;

impl EventStream for JobStream {
    const CONSUMER_NAME: &'static str = "cell-workers";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(7 * 24 * 60 * 60));
    const NAME: &'static str = "CELL_JOBS";
    const SUBJECT: &'static str = "cell.jobs";
}

/// Gets the stream described by `S`, creating it on first use.
pub(crate) async fn get_or_create_stream<S: EventStream>(
    jetstream: &jetstream::Context,
) -> Result<stream::Stream> {
    if let Ok(stream) = jetstream.get_stream(S::NAME).await {
        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            stream = %S::NAME,
            "Using existing stream"
        );
        return Ok(stream);
    }

    let max_age = S::MAX_AGE.unwrap_or_default();
    tracing::debug!(
        target: TRACING_TARGET_STREAM,
        stream = %S::NAME,
        max_age_secs = max_age.as_secs(),
        "Creating new stream"
    );

    let config = stream::Config {
        name: S::NAME.to_string(),
        description: Some(format!("Job log: {}", S::NAME)),
        subjects: vec![S::SUBJECT.to_string()],
        max_age,
        ..Default::default()
    };

    jetstream
        .get_or_create_stream(config)
        .await
        .map_err(|e| Error::stream_error(S::NAME, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_stream() {
        assert_eq!(JobStream::NAME, "CELL_JOBS");
        assert_eq!(JobStream::SUBJECT, "cell.jobs");
        assert_eq!(
            JobStream::MAX_AGE,
            Some(Duration::from_secs(7 * 24 * 60 * 60))
        );
        assert_eq!(JobStream::CONSUMER_NAME, "cell-workers");
    }
}
