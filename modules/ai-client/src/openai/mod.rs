mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::{Completion, CompletionRequest, ResponseFormat};

use client::OpenAiClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Upper bound for a single request, connect through body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone(), self.timeout);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

#[async_trait]
impl Completion for OpenAi {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut wire = types::ChatRequest::new(&self.model);
        if let Some(preamble) = request.preamble {
            wire = wire.message(types::WireMessage::system(preamble));
        }
        wire = wire.message(types::WireMessage::user(request.input));

        if types::uses_max_completion_tokens(&self.model) {
            wire = wire.max_completion_tokens(request.max_tokens);
        } else {
            wire = wire.max_tokens(request.max_tokens);
            if let Some(t) = request.temperature {
                wire = wire.temperature(t);
            }
        }

        if request.format == ResponseFormat::JsonObject {
            wire = wire.json_object();
        }

        let response = self.client().chat(&wire).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AiError::EmptyResponse("OpenAI"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert!(ai.base_url.is_none());
    }

    #[test]
    fn test_openai_with_base_url_and_timeout() {
        let ai = OpenAi::new("sk-test", "gpt-4o")
            .with_base_url("https://proxy.internal/v1")
            .with_timeout(Duration::from_secs(10));
        assert_eq!(ai.base_url.as_deref(), Some("https://proxy.internal/v1"));
        assert_eq!(ai.timeout, Duration::from_secs(10));
    }
}
