//! Scripted completion provider for testing.
//!
//! This module is only available when the `test-utils` feature is enabled.
//!
//! ```rust,ignore
//! let service = MockProvider::new("France")
//!     .failing_on("Tokyo")
//!     .into_service();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    CompletionProvider, CompletionRequest, CompletionResponse, CompletionService, Error, Result,
};

/// Completion provider returning canned text.
///
/// Prompts whose rendered text contains one of the configured failure
/// markers fail with an external error instead.
#[derive(Debug, Clone)]
pub struct MockProvider {
    text: String,
    fail_markers: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("mock completion")
    }
}

impl MockProvider {
    /// Creates a provider that always answers with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail_markers: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails every prompt whose rendered text contains `marker`.
    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_markers.push(marker.into());
        self
    }

    /// Returns how many completions were requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Converts this provider into a [`CompletionService`].
    pub fn into_service(self) -> CompletionService {
        CompletionService::new(self)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = request.prompt.render();

        if self
            .fail_markers
            .iter()
            .any(|marker| prompt.contains(marker.as_str()))
        {
            return Err(Error::external_error().with_message("mock upstream failure"));
        }

        Ok(CompletionResponse::new(
            self.text.clone(),
            format!("mock-{call}"),
        ))
    }
}
