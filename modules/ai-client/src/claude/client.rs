use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::error::Result;
use crate::http::post_json;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API transport: auth headers plus the endpoint.
pub(crate) struct ClaudeClient {
    api_key: String,
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ClaudeClient {
    pub fn new(api_key: &str, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            endpoint: format!("{ANTHROPIC_API_URL}/messages"),
            timeout,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.endpoint = format!("{}/messages", url.trim_end_matches('/'));
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, "Claude chat request");
        post_json(&self.http, &self.endpoint, self.headers()?, self.timeout, request).await
    }
}
