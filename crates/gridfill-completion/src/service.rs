//! Completion service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    CompletionProvider, CompletionRequest, CompletionResponse, Error, Result, TRACING_TARGET,
};

/// Completion service wrapper with observability.
///
/// This wrapper adds deadline enforcement and structured logging to any
/// completion backend. The inner provider is wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct CompletionService {
    inner: Arc<dyn CompletionProvider>,
}

impl fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionService")
            .field("provider", &self.inner.name())
            .finish_non_exhaustive()
    }
}

impl CompletionService {
    /// Create a new completion service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: CompletionProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Returns the wrapped provider's name.
    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }

    /// Makes one completion attempt, bounded by the request's timeout.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            provider = self.inner.name(),
            prompt_len = request.prompt.template.len(),
            timeout_ms = request.timeout.map(|t| t.as_millis() as u64),
            "Requesting completion"
        );

        let result = match request.timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.complete(request))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::timeout()
                        .with_message(format!("completion exceeded {}ms", limit.as_millis())))
                }),
            None => self.inner.complete(request).await,
        };
        let elapsed = started_at.elapsed();

        match &result {
            Ok(response) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    provider = self.inner.name(),
                    trace_id = %response.trace_id,
                    text_len = response.text.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Completion succeeded"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    provider = self.inner.name(),
                    kind = error.kind_str(),
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Completion failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ErrorKind, Prompt};

    struct Echo;

    #[async_trait::async_trait]
    impl CompletionProvider for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse::new(request.prompt.render(), "echo-1"))
        }
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl CompletionProvider for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(CompletionResponse::default())
        }
    }

    #[tokio::test]
    async fn test_complete_passes_through() -> anyhow::Result<()> {
        let service = CompletionService::new(Echo);
        let request = CompletionRequest::new(Prompt::new("{x}!").with_input("x", "hi"));

        let response = service.complete(&request).await?;
        assert_eq!(response.text, "hi!");
        assert_eq!(response.trace_id, "echo-1");
        assert_eq!(service.provider_name(), "echo");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_enforces_timeout() {
        let service = CompletionService::new(Stalled);
        let request =
            CompletionRequest::new(Prompt::new("slow")).with_timeout(Duration::from_secs(5));

        let error = service.complete(&request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Timeout);
    }
}
