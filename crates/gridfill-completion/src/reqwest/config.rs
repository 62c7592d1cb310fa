//! Completion client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{ChainRunnerClient, OpenAiClient};
use crate::{CompletionService, Error, Result};

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_CHAIN_RUNNER_URL: &str = "http://localhost:8000";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for the underlying reqwest HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("gridfill/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Builds a reqwest client from this configuration.
    pub(crate) fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.effective_timeout())
            .user_agent(self.effective_user_agent())
            .build()
            .map_err(|e| {
                Error::configuration()
                    .with_message("failed to create HTTP client")
                    .with_source(e)
            })
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Completion backend selection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProviderKind {
    /// Prompt-template runner exposing `POST /chain/run`.
    #[default]
    ChainRunner,
    /// OpenAI-compatible chat completions API.
    #[cfg_attr(feature = "config", value(name = "openai"))]
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
}

/// Configuration selecting and parameterizing the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct CompletionConfig {
    /// Completion backend to use
    #[cfg_attr(
        feature = "config",
        arg(
            long = "completion-provider",
            env = "COMPLETION_PROVIDER",
            value_enum,
            default_value_t = ProviderKind::ChainRunner
        )
    )]
    #[serde(default)]
    pub provider: ProviderKind,

    /// Base URL of the chain runner service
    #[cfg_attr(
        feature = "config",
        arg(
            long = "chain-runner-url",
            env = "CHAIN_RUNNER_URL",
            default_value = DEFAULT_CHAIN_RUNNER_URL
        )
    )]
    pub chain_runner_url: String,

    /// API key for the OpenAI-compatible backend
    #[cfg_attr(
        feature = "config",
        arg(long = "openai-api-key", env = "OPENAI_API_KEY", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend
    #[cfg_attr(
        feature = "config",
        arg(
            long = "openai-base-url",
            env = "OPENAI_BASE_URL",
            default_value = DEFAULT_OPENAI_BASE_URL
        )
    )]
    pub openai_base_url: String,

    /// Chat model name
    #[cfg_attr(
        feature = "config",
        arg(
            long = "openai-model",
            env = "OPENAI_MODEL",
            default_value = DEFAULT_OPENAI_MODEL
        )
    )]
    pub openai_model: String,

    /// Sampling temperature, omitted from requests when unset
    #[cfg_attr(
        feature = "config",
        arg(long = "openai-temperature", env = "OPENAI_TEMPERATURE")
    )]
    #[serde(default)]
    pub openai_temperature: Option<f32>,

    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(flatten)]
    pub http: ReqwestConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            chain_runner_url: DEFAULT_CHAIN_RUNNER_URL.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_temperature: None,
            http: ReqwestConfig::default(),
        }
    }
}

impl CompletionConfig {
    /// Select the backend.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Set the OpenAI API key.
    #[must_use]
    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.provider {
            ProviderKind::ChainRunner => {
                url::Url::parse(&self.chain_runner_url)
                    .map_err(|e| format!("Invalid chain runner URL: {e}"))?;
            }
            ProviderKind::OpenAi => {
                url::Url::parse(&self.openai_base_url)
                    .map_err(|e| format!("Invalid OpenAI base URL: {e}"))?;
                if self.openai_api_key.as_deref().is_none_or(str::is_empty) {
                    return Err("OPENAI_API_KEY is required for the openai provider".into());
                }
                if self.openai_model.is_empty() {
                    return Err("OpenAI model cannot be empty".into());
                }
                if let Some(t) = self.openai_temperature
                    && !(0.0..=2.0).contains(&t)
                {
                    return Err(format!("Temperature must be between 0 and 2, got {t}"));
                }
            }
        }
        Ok(())
    }

    /// Builds the configured backend wrapped in a [`CompletionService`].
    pub fn into_service(self) -> Result<CompletionService> {
        self.validate()
            .map_err(|reason| Error::configuration().with_message(reason))?;

        let service = match self.provider {
            ProviderKind::ChainRunner => {
                ChainRunnerClient::new(&self.chain_runner_url, &self.http)?.into_service()
            }
            ProviderKind::OpenAi => OpenAiClient::new(&self)?.into_service(),
        };
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompletionConfig::default();
        assert_eq!(config.provider, ProviderKind::ChainRunner);
        assert_eq!(config.chain_runner_url, "http://localhost:8000");
        assert_eq!(config.openai_model, "gpt-3.5-turbo");
        assert_eq!(config.http.effective_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openai_requires_key() {
        let config = CompletionConfig::default().with_provider(ProviderKind::OpenAi);
        assert!(config.validate().is_err());
        assert!(config.with_openai_api_key("sk-test").validate().is_ok());
    }

    #[test]
    fn test_openai_rejects_bad_temperature() {
        let mut config = CompletionConfig::default()
            .with_provider(ProviderKind::OpenAi)
            .with_openai_api_key("sk-test");
        config.openai_temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(ProviderKind::ChainRunner.as_ref(), "chain-runner");
        assert_eq!(ProviderKind::OpenAi.as_ref(), "openai");
    }

    #[test]
    fn test_effective_user_agent_uses_default_when_none() {
        let config = ReqwestConfig::default();
        assert!(config.effective_user_agent().starts_with("gridfill/"));
        assert_eq!(config.with_timeout(0).effective_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_into_service_builds_selected_backend() -> anyhow::Result<()> {
        let service = CompletionConfig::default().into_service()?;
        assert_eq!(service.provider_name(), "chain-runner");

        let service = CompletionConfig::default()
            .with_provider(ProviderKind::OpenAi)
            .with_openai_api_key("sk-test")
            .into_service()?;
        assert_eq!(service.provider_name(), "openai");
        Ok(())
    }
}
