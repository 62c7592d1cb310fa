//! Generic event stream publisher.

use std::marker::PhantomData;

use async_nats::HeaderMap;
use async_nats::jetstream::Context;
use serde::Serialize;

use super::event_stream::{EventStream, get_or_create_stream};
use super::{JobEntry, JobStream};
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Header used by JetStream for publish deduplication.
const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Publisher of job entries to the job log.
pub type JobPublisher = EventPublisher<JobEntry, JobStream>;

/// Generic event publisher for appending typed entries to a stream.
///
/// This publisher is generic over:
/// - `T`: The event/message type to publish
/// - `S`: The stream configuration (determines stream name, subject, etc.)
#[derive(Debug, Clone)]
pub struct EventPublisher<T, S>
where
    T: Serialize + Send + Sync + 'static,
    S: EventStream,
{
    jetstream: Context,
    _marker: PhantomData<(T, S)>,
}

impl<T, S> EventPublisher<T, S>
where
    T: Serialize + Send + Sync + 'static,
    S: EventStream,
{
    /// Create a new event publisher, creating the stream if it doesn't exist.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_STREAM)]
    pub(crate) async fn new(jetstream: &Context) -> Result<Self> {
        get_or_create_stream::<S>(jetstream).await?;
        Ok(Self {
            jetstream: jetstream.clone(),
            _marker: PhantomData,
        })
    }

    /// Append an event with a deduplication id and wait for the stream to
    /// acknowledge it.
    ///
    /// Returns the stream sequence assigned to the event. A second publish
    /// with the same id inside the stream's duplicate window is acknowledged
    /// without storing a new message.
    pub async fn publish_with_id(&self, msg_id: &str, event: &T) -> Result<u64> {
        let mut headers = HeaderMap::new();
        headers.insert(MSG_ID_HEADER, msg_id);

        let payload = serde_json::to_vec(event)?;
        let payload_size = payload.len();

        let ack = self
            .jetstream
            .publish_with_headers(S::SUBJECT, headers, payload.into())
            .await
            .map_err(|e| Error::delivery_failed(S::SUBJECT, e.to_string()))?
            .await
            .map_err(|e| Error::delivery_failed(S::SUBJECT, e.to_string()))?;

        tracing::trace!(
            target: TRACING_TARGET_STREAM,
            subject = %S::SUBJECT,
            sequence = ack.sequence,
            msg_id = %msg_id,
            duplicate = ack.duplicate,
            payload_size = payload_size,
            "Published event"
        );
        Ok(ack.sequence)
    }
}

impl JobPublisher {
    /// Append a job entry, deduplicated by its coordinate.
    #[tracing::instrument(
        skip(self, job),
        fields(batch_id = %job.batch_id(), kind = %job.kind()),
        target = TRACING_TARGET_STREAM
    )]
    pub async fn append(&self, job: &JobEntry) -> Result<u64> {
        self.publish_with_id(&job.message_id(), job).await
    }
}
