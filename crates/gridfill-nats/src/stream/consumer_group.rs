//! Consumer group configuration for the job log.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{EventStream, JobStream};

/// Where a newly created consumer group starts reading.
///
/// Applied only when the group is created; an existing group keeps its
/// position regardless of this setting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StartPosition {
    /// Only entries appended after the group is created.
    #[default]
    New,
    /// Every entry still retained by the stream.
    All,
}

impl From<StartPosition> for async_nats::jetstream::consumer::DeliverPolicy {
    fn from(position: StartPosition) -> Self {
        match position {
            StartPosition::New => Self::New,
            StartPosition::All => Self::All,
        }
    }
}

/// Durable consumer group settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ConsumerGroupConfig {
    /// Durable consumer group name shared by all workers
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-consumer-group",
            env = "WORKER_CONSUMER_GROUP",
            default_value = JobStream::CONSUMER_NAME
        )
    )]
    pub group_name: String,

    /// Start position applied when the group is first created
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-start-position",
            env = "WORKER_START_POSITION",
            value_enum,
            default_value_t = StartPosition::New
        )
    )]
    pub start_position: StartPosition,

    /// Seconds an unacknowledged entry stays claimed before redelivery
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-ack-wait",
            env = "WORKER_ACK_WAIT_SECS",
            default_value_t = DEFAULT_ACK_WAIT_SECS
        )
    )]
    pub ack_wait_secs: u64,

    /// Maximum delivery attempts per entry
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-max-deliver",
            env = "WORKER_MAX_DELIVER",
            default_value_t = DEFAULT_MAX_DELIVER
        )
    )]
    pub max_deliver: i64,
}

const DEFAULT_ACK_WAIT_SECS: u64 = 60;
const DEFAULT_MAX_DELIVER: i64 = 5;

impl Default for ConsumerGroupConfig {
    fn default() -> Self {
        Self {
            group_name: JobStream::CONSUMER_NAME.to_string(),
            start_position: StartPosition::default(),
            ack_wait_secs: DEFAULT_ACK_WAIT_SECS,
            max_deliver: DEFAULT_MAX_DELIVER,
        }
    }
}

impl ConsumerGroupConfig {
    /// Set the group name.
    #[must_use]
    pub fn with_group_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = name.into();
        self
    }

    /// Set the start position used on group creation.
    #[must_use]
    pub fn with_start_position(mut self, position: StartPosition) -> Self {
        self.start_position = position;
        self
    }

    /// Set the ack wait in seconds.
    #[must_use]
    pub fn with_ack_wait_secs(mut self, secs: u64) -> Self {
        self.ack_wait_secs = secs;
        self
    }

    /// Set the maximum delivery count.
    #[must_use]
    pub fn with_max_deliver(mut self, max_deliver: i64) -> Self {
        self.max_deliver = max_deliver;
        self
    }

    /// Returns the ack wait as a Duration.
    #[inline]
    pub fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_secs)
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.group_name.is_empty() {
            return Err("Consumer group name cannot be empty".to_string());
        }
        if self.group_name.contains(['.', '*', '>', ' ']) {
            return Err(format!(
                "Consumer group name contains invalid characters: {}",
                self.group_name
            ));
        }
        if self.ack_wait_secs == 0 {
            return Err("Ack wait must be at least one second".to_string());
        }
        if self.max_deliver == 0 || self.max_deliver < -1 {
            return Err("Max deliver must be positive or -1 for unlimited".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_nats::jetstream::consumer::DeliverPolicy;

    use super::*;

    #[test]
    fn test_default_group() {
        let config = ConsumerGroupConfig::default();
        assert_eq!(config.group_name, "cell-workers");
        assert_eq!(config.start_position, StartPosition::New);
        assert_eq!(config.ack_wait(), Duration::from_secs(60));
        assert_eq!(config.max_deliver, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_start_position_maps_to_deliver_policy() {
        assert!(matches!(
            DeliverPolicy::from(StartPosition::New),
            DeliverPolicy::New
        ));
        assert!(matches!(
            DeliverPolicy::from(StartPosition::All),
            DeliverPolicy::All
        ));
        assert_eq!("all".parse::<StartPosition>().unwrap(), StartPosition::All);
    }

    #[test]
    fn test_validation() {
        let base = ConsumerGroupConfig::default();
        assert!(base.clone().with_group_name("").validate().is_err());
        assert!(base.clone().with_group_name("a.b").validate().is_err());
        assert!(base.clone().with_ack_wait_secs(0).validate().is_err());
        assert!(base.clone().with_max_deliver(0).validate().is_err());
        assert!(base.with_max_deliver(-1).validate().is_ok());
    }
}
