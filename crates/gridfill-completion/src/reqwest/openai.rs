//! Client for OpenAI-compatible chat completion APIs.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CompletionConfig, Error, TRACING_TARGET};
use crate::{CompletionProvider, CompletionRequest, CompletionResponse, CompletionService};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

struct OpenAiClientInner {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

/// Completion backend for `POST /v1/chat/completions`.
///
/// The prompt is rendered locally and sent as a single user message. The
/// generated text is the first choice's content; the response id is used as
/// the trace token.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Creates a client from the OpenAI fields of `config`.
    pub fn new(config: &CompletionConfig) -> crate::Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| crate::Error::configuration().with_message("missing OpenAI API key"))?;

        let endpoint = Url::parse(&format!(
            "{}/",
            config.openai_base_url.trim_end_matches('/')
        ))
        .and_then(|base| base.join("v1/chat/completions"))
        .map_err(Error::from)?;
        let http = config.http.build_client()?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %endpoint,
            model = %config.openai_model,
            "Created OpenAI client"
        );

        Ok(Self {
            inner: Arc::new(OpenAiClientInner {
                http,
                endpoint,
                api_key,
                model: config.openai_model.clone(),
                temperature: config.openai_temperature,
            }),
        })
    }

    /// Returns the full chat completions endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Converts this client into a [`CompletionService`] for use with dependency injection.
    pub fn into_service(self) -> CompletionService {
        CompletionService::new(self)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> crate::Result<CompletionResponse> {
        let content = request.prompt.render();
        let body = ChatRequest {
            model: &self.inner.model,
            messages: [ChatMessage {
                role: "user",
                content: &content,
            }],
            temperature: self.inner.temperature,
        };

        let mut http_request = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .bearer_auth(&self.inner.api_key)
            .json(&body);
        if let Some(timeout) = request.timeout {
            http_request = http_request.timeout(timeout);
        }

        let response = http_request.send().await.map_err(Error::from)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(Error::from)?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
            .into());
        }

        let parsed: ChatResponse = serde_json::from_slice(&bytes).map_err(Error::from)?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            crate::Error::invalid_response().with_message("no choices returned from OpenAI")
        })?;

        Ok(CompletionResponse::new(choice.message.content, parsed.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reqwest::ProviderKind;

    fn config() -> CompletionConfig {
        CompletionConfig::default()
            .with_provider(ProviderKind::OpenAi)
            .with_openai_api_key("sk-test")
    }

    #[test]
    fn test_endpoint_joins_base_url() -> anyhow::Result<()> {
        let mut config = config();
        config.openai_base_url = "https://llm.internal/".into();
        let client = OpenAiClient::new(&config)?;
        assert_eq!(
            client.endpoint().as_str(),
            "https://llm.internal/v1/chat/completions"
        );
        Ok(())
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = OpenAiClient::new(&CompletionConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_request_omits_unset_temperature() -> anyhow::Result<()> {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: [ChatMessage {
                role: "user",
                content: "What is the Country of Paris?",
            }],
            temperature: None,
        };

        let json = serde_json::to_value(&body)?;
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
        Ok(())
    }

    #[test]
    fn test_response_takes_first_choice() -> anyhow::Result<()> {
        let raw = r#"{"id":"chatcmpl-1","choices":[{"message":{"role":"assistant","content":"France"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw)?;
        assert_eq!(parsed.id, "chatcmpl-1");
        assert_eq!(parsed.choices[0].message.content, "France");
        Ok(())
    }
}
