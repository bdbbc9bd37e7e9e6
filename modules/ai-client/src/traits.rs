use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// Completion Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider for a single JSON object. Providers without a native
    /// JSON mode get an extra instruction instead, so callers must still parse
    /// defensively.
    JsonObject,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub preamble: Option<String>,
    pub input: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            preamble: None,
            input: input.into(),
            temperature: None,
            max_tokens: 1024,
            format: ResponseFormat::Text,
        }
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json_object(mut self) -> Self {
        self.format = ResponseFormat::JsonObject;
        self
    }
}

// =============================================================================
// Completion Trait
// =============================================================================

/// Dyn-compatible single-turn chat completion.
#[async_trait]
pub trait Completion: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let req = CompletionRequest::new("hello")
            .preamble("be brief")
            .temperature(0.2)
            .max_tokens(64)
            .json_object();
        assert_eq!(req.input, "hello");
        assert_eq!(req.preamble.as_deref(), Some("be brief"));
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, 64);
        assert_eq!(req.format, ResponseFormat::JsonObject);
    }

    #[test]
    fn defaults_to_plain_text() {
        let req = CompletionRequest::new("hi");
        assert_eq!(req.format, ResponseFormat::Text);
        assert!(req.preamble.is_none());
        assert!(req.temperature.is_none());
    }
}
