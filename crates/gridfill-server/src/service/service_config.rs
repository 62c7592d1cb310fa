use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use gridfill_completion::CompletionService;
use gridfill_completion::reqwest::CompletionConfig;
use gridfill_nats::{NatsClient, NatsConfig};
use serde::{Deserialize, Serialize};

use crate::service::BatchStorage;
use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    /// Default retention of batch metadata: 24 hours.
    pub const BATCH_TTL_SECS: u64 = 24 * 60 * 60;
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Broker connection.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub nats: NatsConfig,

    /// Completion backend.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub completion: CompletionConfig,

    /// Retention of batch metadata in seconds
    #[cfg_attr(
        feature = "config",
        arg(long, env = "BATCH_TTL_SECS", default_value_t = defaults::BATCH_TTL_SECS)
    )]
    #[builder(default = "defaults::BATCH_TTL_SECS")]
    pub batch_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            completion: CompletionConfig::default(),
            batch_ttl_secs: defaults::BATCH_TTL_SECS,
        }
    }
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Returns the batch metadata retention.
    pub fn batch_ttl(&self) -> Duration {
        Duration::from_secs(self.batch_ttl_secs)
    }

    /// Validates every nested configuration.
    pub fn validate(&self) -> Result<()> {
        self.nats.validate().map_err(Error::config)?;
        self.completion.validate().map_err(Error::config)?;
        if self.batch_ttl_secs == 0 {
            return Err(Error::config("Batch TTL must be greater than 0"));
        }
        Ok(())
    }

    /// Connects to the NATS server.
    pub async fn connect_nats(&self) -> Result<NatsClient> {
        NatsClient::connect(self.nats.clone())
            .await
            .map_err(|e| Error::external("NATS", "Failed to connect to NATS").with_source(e))
    }

    /// Opens the batch stores and job publisher on an existing connection.
    pub async fn open_storage(&self, nats: &NatsClient) -> Result<BatchStorage> {
        BatchStorage::nats(nats, self.batch_ttl())
            .await
            .map_err(|e| Error::external("NATS", "Failed to open batch storage").with_source(e))
    }

    /// Builds the configured completion backend.
    pub fn create_completion(&self) -> Result<CompletionService> {
        self.completion.clone().into_service().map_err(|e| {
            Error::external("completion", "Failed to create completion backend").with_source(e)
        })
    }
}

impl ServiceConfigBuilder {
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if let Some(nats) = &builder.nats {
            nats.validate()?;
        }

        if let Some(completion) = &builder.completion {
            completion.validate()?;
        }

        if builder.batch_ttl_secs == Some(0) {
            return Err("Batch TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}
