//! Client for the prompt-template chain runner service.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Error, ReqwestConfig, TRACING_TARGET};
use crate::{CompletionProvider, CompletionRequest, CompletionResponse, CompletionService};

/// Request body of `POST /chain/run`.
#[derive(Debug, Serialize)]
struct ChainRunRequest<'a> {
    prompt_template: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

/// Response body of `POST /chain/run`.
#[derive(Debug, Deserialize)]
struct ChainRunResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    trace_id: String,
    #[serde(default)]
    error: Option<String>,
}

struct ChainRunnerClientInner {
    http: Client,
    endpoint: Url,
}

/// Completion backend that forwards prompt templates to a chain runner.
///
/// The runner receives the template and its inputs unrendered and fills
/// them itself.
#[derive(Clone)]
pub struct ChainRunnerClient {
    inner: Arc<ChainRunnerClientInner>,
}

impl std::fmt::Debug for ChainRunnerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRunnerClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl ChainRunnerClient {
    /// Creates a client for the runner at `base_url`.
    pub fn new(base_url: &str, config: &ReqwestConfig) -> crate::Result<Self> {
        let endpoint = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .and_then(|base| base.join("chain/run"))
            .map_err(Error::from)?;
        let http = config.build_client()?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %endpoint,
            timeout_ms = config.effective_timeout().as_millis(),
            "Created chain runner client"
        );

        Ok(Self {
            inner: Arc::new(ChainRunnerClientInner { http, endpoint }),
        })
    }

    /// Returns the full `/chain/run` endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Converts this client into a [`CompletionService`] for use with dependency injection.
    pub fn into_service(self) -> CompletionService {
        CompletionService::new(self)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ChainRunnerClient {
    fn name(&self) -> &'static str {
        "chain-runner"
    }

    async fn complete(&self, request: &CompletionRequest) -> crate::Result<CompletionResponse> {
        let body = ChainRunRequest {
            prompt_template: &request.prompt.template,
            inputs: &request.prompt.inputs,
        };

        let mut http_request = self.inner.http.post(self.inner.endpoint.clone()).json(&body);
        if let Some(timeout) = request.timeout {
            http_request = http_request.timeout(timeout);
        }

        let response = http_request.send().await.map_err(Error::from)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(Error::from)?;

        if status != StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
            .into());
        }

        let parsed: ChainRunResponse = serde_json::from_slice(&bytes).map_err(Error::from)?;
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Err(crate::Error::external_error().with_message(error));
        }

        Ok(CompletionResponse::new(parsed.result, parsed.trace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Prompt;

    #[test]
    fn test_endpoint_joins_base_url() -> anyhow::Result<()> {
        let client = ChainRunnerClient::new("http://runner:8000", &ReqwestConfig::default())?;
        assert_eq!(client.endpoint().as_str(), "http://runner:8000/chain/run");
        Ok(())
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = ChainRunnerClient::new("not a url", &ReqwestConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_request_body_keeps_template_unrendered() -> anyhow::Result<()> {
        let prompt = Prompt::new("What is the {attribute} of {item}?")
            .with_input("attribute", "Country")
            .with_input("item", "Paris");
        let body = ChainRunRequest {
            prompt_template: &prompt.template,
            inputs: &prompt.inputs,
        };

        let json = serde_json::to_value(&body)?;
        assert_eq!(json["prompt_template"], "What is the {attribute} of {item}?");
        assert_eq!(json["inputs"]["item"], "Paris");
        Ok(())
    }

    #[test]
    fn test_response_tolerates_missing_error() -> anyhow::Result<()> {
        let parsed: ChainRunResponse =
            serde_json::from_str(r#"{"result":"France","trace_id":"t-1"}"#)?;
        assert_eq!(parsed.result, "France");
        assert!(parsed.error.is_none());
        Ok(())
    }
}
