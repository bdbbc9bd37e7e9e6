pub mod error;
pub mod types;

pub use error::{RedditError, Result};
pub use types::{AccessToken, Listing, RedditPost};

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";

/// Refresh the cached token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Script-app credentials for Reddit's password grant.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct RedditClient {
    client: reqwest::Client,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
    token_url: String,
    base_url: String,
    timeout: Duration,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            token: Mutex::new(None),
            token_url: TOKEN_URL.to_string(),
            base_url: OAUTH_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point both the token and API endpoints at another host (tests, proxies).
    pub fn with_base_urls(mut self, token_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.base_url = base_url.into();
        self
    }

    /// Upper bound for each HTTP round-trip (token and search alike).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return a cached bearer token, fetching a new one when missing or near expiry.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(ref t) = *cached {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < t.expires_at {
                return Ok(t.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            token: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
        });
        Ok(token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        tracing::debug!("Requesting Reddit access token");

        let creds = &self.credentials;
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header(reqwest::header::USER_AGENT, &creds.user_agent)
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RedditError::Auth {
                status: status.as_u16(),
                message: body,
            });
        }

        // Reddit answers bad credentials with 200 + {"error": "invalid_grant"}
        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(err) = value.get("error") {
            return Err(RedditError::Auth {
                status: status.as_u16(),
                message: err.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Search posts site-wide for `query`, newest first.
    pub async fn search_posts(&self, query: &str, limit: u32) -> Result<Vec<RedditPost>> {
        tracing::info!(query, limit, "Starting Reddit search");

        let token = self.access_token().await?;
        let url = format!("{}/search", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .query(&[
                ("q", query),
                ("type", "link"),
                ("sort", "new"),
                ("limit", limit.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let listing: Listing<RedditPost> = resp.json().await?;
        let posts: Vec<RedditPost> = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| child.data)
            .collect();

        tracing::info!(count = posts.len(), "Fetched Reddit posts");
        Ok(posts)
    }
}
