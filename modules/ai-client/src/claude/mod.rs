mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::{Completion, CompletionRequest, ResponseFormat};

use client::ClaudeClient;
use types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Appended to the system prompt when a JSON object is requested; the
/// Messages API has no native JSON response mode.
const JSON_ONLY_INSTRUCTION: &str =
    "Respond with a single JSON object only. No prose, no markdown fences.";

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl Claude {
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

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone(), self.timeout);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

#[async_trait]
impl Completion for Claude {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let system = match (request.preamble, request.format) {
            (Some(p), ResponseFormat::JsonObject) => Some(format!("{p}\n\n{JSON_ONLY_INSTRUCTION}")),
            (None, ResponseFormat::JsonObject) => Some(JSON_ONLY_INSTRUCTION.to_string()),
            (p, ResponseFormat::Text) => p,
        };

        let mut wire = ChatRequest::new(&self.model)
            .message(WireMessage::user(request.input))
            .max_tokens(request.max_tokens)
            .temperature(request.temperature);
        if let Some(system) = system {
            wire = wire.system(system);
        }

        let response = self.client().chat(&wire).await?;

        response.text().ok_or(AiError::EmptyResponse("Claude"))
    }
}
