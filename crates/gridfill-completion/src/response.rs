//! Completion response types.

use serde::{Deserialize, Serialize};

/// Text returned by a completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text.
    pub text: String,
    /// Upstream trace or correlation token, empty when unavailable.
    pub trace_id: String,
}

impl CompletionResponse {
    /// Creates a response with generated text and a trace token.
    pub fn new(text: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            trace_id: trace_id.into(),
        }
    }
}
