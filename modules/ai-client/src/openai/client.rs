use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::error::Result;
use crate::http::post_json;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Chat Completions transport: bearer auth plus the endpoint.
pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: &str, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            endpoint: format!("{OPENAI_API_URL}/chat/completions"),
            timeout,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.endpoint = format!("{}/chat/completions", url.trim_end_matches('/'));
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            model = %request.model,
            json_mode = request.response_format.is_some(),
            "OpenAI chat request"
        );
        post_json(&self.http, &self.endpoint, self.headers()?, self.timeout, request).await
    }
}
