//! Durable consumer group subscriber.

use std::marker::PhantomData;
use std::time::Duration;

use async_nats::jetstream::consumer::{self, Consumer};
use async_nats::jetstream::{AckKind, Context, Message};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use super::event_stream::{EventStream, get_or_create_stream};
use super::{ConsumerGroupConfig, JobEntry, JobStream};
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Consumer group member reading job entries.
pub type JobSubscriber = EventSubscriber<JobEntry, JobStream>;

/// Member of a durable pull consumer group.
///
/// Every subscriber created with the same group name shares delivery state:
/// an entry is handed to one member at a time and stays pending until that
/// member acknowledges it or the ack wait elapses.
#[derive(Debug)]
pub struct EventSubscriber<T, S>
where
    T: DeserializeOwned + Send + Sync + 'static,
    S: EventStream,
{
    consumer: Consumer<consumer::pull::Config>,
    group_name: String,
    _marker: PhantomData<(T, S)>,
}

impl<T, S> EventSubscriber<T, S>
where
    T: DeserializeOwned + Send + Sync + 'static,
    S: EventStream,
{
    /// Join the consumer group, creating the stream and group if needed.
    ///
    /// Creating a group that already exists is a no-op: the existing group's
    /// start position and delivery state are kept.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_STREAM)]
    pub(crate) async fn new(jetstream: &Context, group: &ConsumerGroupConfig) -> Result<Self> {
        let stream = get_or_create_stream::<S>(jetstream).await?;

        let consumer_config = consumer::pull::Config {
            durable_name: Some(group.group_name.clone()),
            description: Some(format!("Consumer group for stream {}", S::NAME)),
            ack_policy: consumer::AckPolicy::Explicit,
            deliver_policy: group.start_position.into(),
            ack_wait: group.ack_wait(),
            max_deliver: group.max_deliver,
            ..Default::default()
        };

        let consumer = stream
            .get_or_create_consumer(&group.group_name, consumer_config)
            .await
            .map_err(|e| Error::consumer_error(&group.group_name, e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET_STREAM,
            stream = %S::NAME,
            consumer = %group.group_name,
            start_position = %group.start_position,
            "Joined consumer group"
        );

        Ok(Self {
            consumer,
            group_name: group.group_name.clone(),
            _marker: PhantomData,
        })
    }

    /// Claim up to `max_messages` undelivered entries.
    ///
    /// Blocks for at most `expires` when no entries are available and then
    /// returns an empty batch. Claimed entries are pending for this group
    /// until acknowledged. Entries whose payload cannot be decoded are
    /// terminated so they are never redelivered.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STREAM)]
    pub async fn fetch(
        &self,
        max_messages: usize,
        expires: Duration,
    ) -> Result<Vec<TypedMessage<T>>> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(expires)
            .messages()
            .await
            .map_err(|e| Error::consumer_error(&self.group_name, e.to_string()))?;

        let mut batch = Vec::with_capacity(max_messages);
        while let Some(message) = messages.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STREAM,
                        consumer = %self.group_name,
                        error = %e,
                        "Error receiving message in batch"
                    );
                    continue;
                }
            };

            if let Some(payload) =
                decode_or_term::<T, _>(&message.payload, &message, &self.group_name).await
            {
                batch.push(TypedMessage { payload, message });
            }
        }

        if !batch.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_STREAM,
                consumer = %self.group_name,
                batch_size = batch.len(),
                "Claimed batch of messages"
            );
        }
        Ok(batch)
    }

    /// Returns the consumer group name.
    #[inline]
    pub fn group_name(&self) -> &str {
        &self.group_name
    }
}

/// Settles a claimed entry with its consumer group.
#[async_trait]
pub trait Settle: Send + Sync {
    /// Acknowledge the entry, removing it from the pending list.
    async fn ack(&self) -> Result<()>;

    /// Request redelivery after `delay`, or after the ack wait if `None`.
    async fn nack(&self, delay: Option<Duration>) -> Result<()>;

    /// Terminate the entry; it is never redelivered.
    async fn term(&self) -> Result<()>;
}

#[async_trait]
impl Settle for Message {
    async fn ack(&self) -> Result<()> {
        self.ack_with(AckKind::Ack)
            .await
            .map_err(|e| Error::operation("message_ack", e.to_string()))
    }

    async fn nack(&self, delay: Option<Duration>) -> Result<()> {
        self.ack_with(AckKind::Nak(delay))
            .await
            .map_err(|e| Error::operation("message_nack", e.to_string()))
    }

    async fn term(&self) -> Result<()> {
        self.ack_with(AckKind::Term)
            .await
            .map_err(|e| Error::operation("message_term", e.to_string()))
    }
}

/// Decodes a payload, terminating the entry when it is not a valid `T`.
async fn decode_or_term<T, M>(payload: &[u8], message: &M, consumer: &str) -> Option<T>
where
    T: DeserializeOwned,
    M: Settle,
{
    let error = match serde_json::from_slice::<T>(payload) {
        Ok(decoded) => return Some(decoded),
        Err(error) => error,
    };

    tracing::error!(
        target: TRACING_TARGET_STREAM,
        consumer = %consumer,
        error = %error,
        "Terminating undecodable message"
    );
    if let Err(e) = message.term().await {
        tracing::warn!(
            target: TRACING_TARGET_STREAM,
            error = %e,
            "Failed to terminate message"
        );
    }
    None
}

/// A claimed message with its decoded payload.
#[derive(Debug)]
pub struct TypedMessage<T> {
    /// The deserialized payload.
    pub payload: T,
    /// The underlying NATS message for metadata and acknowledgment.
    message: Message,
}

impl<T> TypedMessage<T> {
    /// Get a reference to the typed payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Get the number of delivery attempts, starting at 1.
    pub fn delivery_count(&self) -> Result<u64> {
        self.message
            .info()
            .map(|info| info.delivered.max(1) as u64)
            .map_err(|e| Error::operation("message_info", e.to_string()))
    }
}

#[async_trait]
impl<T: Send + Sync> Settle for TypedMessage<T> {
    async fn ack(&self) -> Result<()> {
        Settle::ack(&self.message).await
    }

    async fn nack(&self, delay: Option<Duration>) -> Result<()> {
        Settle::nack(&self.message, delay).await
    }

    async fn term(&self) -> Result<()> {
        Settle::term(&self.message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl Recorder {
        fn calls(&self) -> Vec<&'static str> {
            self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
        }

        fn record(&self, call: &'static str) -> Result<()> {
            if let Ok(mut calls) = self.0.lock() {
                calls.push(call);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Settle for Recorder {
        async fn ack(&self) -> Result<()> {
            self.record("ack")
        }

        async fn nack(&self, _delay: Option<Duration>) -> Result<()> {
            self.record("nack")
        }

        async fn term(&self) -> Result<()> {
            self.record("term")
        }
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_terminated() {
        let recorder = Recorder::default();

        let decoded =
            decode_or_term::<JobEntry, _>(br#"{"kind":"sheet","row":1}"#, &recorder, "workers").await;

        assert!(decoded.is_none());
        assert_eq!(recorder.calls(), vec!["term"]);
    }

    #[tokio::test]
    async fn test_valid_entry_is_left_pending() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let raw = br#"{"kind":"cell","batch_id":"abc123","row":1,"col":2,"value":"b"}"#;

        let decoded = decode_or_term::<JobEntry, _>(raw, &recorder, "workers").await;

        assert_eq!(decoded.map(|job| job.position()), Some((1, 2)));
        assert!(recorder.calls().is_empty());
        Ok(())
    }
}
