//! Completion request types.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A prompt template with named inputs.
///
/// Placeholders are written `{name}`. Backends that accept templates receive
/// both parts; others receive the [`rendered`](Prompt::render) text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Template text with `{name}` placeholders.
    pub template: String,
    /// Values substituted into the template.
    pub inputs: BTreeMap<String, String>,
}

impl Prompt {
    /// Creates a prompt without inputs.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            inputs: BTreeMap::new(),
        }
    }

    /// Adds a named input.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Substitutes every input into the template in a single pass.
    ///
    /// Placeholders without a matching input are kept verbatim.
    pub fn render(&self) -> String {
        let mut text = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some((before, name, after)) = next_placeholder(rest) {
            text.push_str(before);
            match self.inputs.get(name) {
                Some(value) => text.push_str(value),
                None => {
                    text.push('{');
                    text.push_str(name);
                    text.push('}');
                }
            }
            rest = after;
        }
        text.push_str(rest);
        text
    }

    /// Returns the names of placeholders without a matching input.
    pub fn missing_inputs(&self) -> Vec<&str> {
        let mut missing = Vec::new();
        let mut rest = self.template.as_str();
        while let Some((_, name, after)) = next_placeholder(rest) {
            if !self.inputs.contains_key(name) {
                missing.push(name);
            }
            rest = after;
        }
        missing
    }
}

/// Splits `text` around its first `{name}` placeholder.
fn next_placeholder(text: &str) -> Option<(&str, &str, &str)> {
    let start = text.find('{')?;
    let len = text[start + 1..].find('}')?;
    let end = start + 1 + len;
    Some((&text[..start], &text[start + 1..end], &text[end + 1..]))
}

/// A single completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Prompt to complete.
    pub prompt: Prompt,
    /// Deadline for the call; the provider's own timeout applies when unset.
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    /// Creates a request for the given prompt.
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            timeout: None,
        }
    }

    /// Sets the call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
