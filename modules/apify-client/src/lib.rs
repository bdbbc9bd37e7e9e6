pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{RunData, Tweet, TweetAuthor, TweetSearchInput};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apidojo/tweet-scraper.
const TWEET_SCRAPER: &str = "61RPP7dywgiy0JPD0";

/// Longest `waitForFinish` Apify honors on a single poll.
const WAIT_FOR_FINISH_SECS: u64 = 60;

/// Extra time a long-poll request gets beyond its `waitForFinish`.
const POLL_SLACK_SECS: u64 = 15;

/// Long-polls before giving up on a run (~5 minutes).
const DEFAULT_MAX_POLLS: u32 = 5;

/// Timeout for the short requests: start, dataset fetch, abort.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    wait_secs: u64,
    max_polls: u32,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
            wait_secs: WAIT_FOR_FINISH_SECS,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    /// Fit the poll phase into `budget`: each long-poll waits at most 60s
    /// and as many polls as fit are allowed (at least one).
    pub fn with_run_timeout(mut self, budget: Duration) -> Self {
        let secs = budget.as_secs().max(1);
        self.wait_secs = secs.min(WAIT_FOR_FINISH_SECS);
        self.max_polls = u32::try_from(secs / self.wait_secs)
            .unwrap_or(u32::MAX)
            .max(1);
        self
    }

    /// Time the run is given to finish, excluding request overhead.
    pub fn poll_budget(&self) -> Duration {
        Duration::from_secs(self.wait_secs).saturating_mul(self.max_polls)
    }

    /// Worst-case wall time of [`run_actor`](Self::run_actor) when every
    /// request runs into its own timeout. Callers wrapping a run in an outer
    /// timeout should allow at least this much so a stuck run still gets
    /// aborted.
    pub fn run_deadline(&self) -> Duration {
        let polls =
            Duration::from_secs(self.wait_secs + POLL_SLACK_SECS).saturating_mul(self.max_polls);
        // start + (dataset fetch | abort)
        polls.saturating_add(REQUEST_TIMEOUT * 2)
    }

    async fn check<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp.json().await?)
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .json(input)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = Self::check(resp).await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish` for efficient long-polling
    /// and gives up after `max_polls` rounds.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let mut last_status = String::new();
        for _ in 0..self.max_polls {
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={}",
                self.base_url, run_id, self.wait_secs
            );
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .timeout(Duration::from_secs(self.wait_secs + POLL_SLACK_SECS))
                .send()
                .await?;

            let api_resp: ApiResponse<RunData> = Self::check(resp).await?;
            let run = api_resp.data;
            if run.status == "SUCCEEDED" {
                return Ok(run);
            }
            if run.is_terminal_failure() {
                return Err(ApifyError::RunFailed(run.status));
            }
            tracing::debug!(run_id, status = %run.status, "Run still in progress");
            last_status = run.status;
        }

        Err(ApifyError::RunNotFinished {
            run_id: run_id.to_string(),
            status: last_status,
            polls: self.max_polls,
        })
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        Self::check(resp).await
    }

    /// Ask Apify to stop a run so it stops consuming credits.
    pub async fn abort_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}/abort", self.base_url, run_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = Self::check(resp).await?;
        Ok(api_resp.data)
    }

    /// Run an actor end-to-end: start, poll, fetch results. A run that does
    /// not finish within the poll budget, or whose polling fails, is aborted.
    pub async fn run_actor<I: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<Vec<T>> {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(run_id = %run.id, actor_id, "Apify run started, polling for completion");

        let completed = match self.wait_for_run(&run.id).await {
            Ok(completed) => completed,
            Err(e) => {
                if !matches!(e, ApifyError::RunFailed(_)) {
                    match self.abort_run(&run.id).await {
                        Ok(aborted) => {
                            tracing::warn!(run_id = %run.id, status = %aborted.status, error = %e, "Aborted Apify run")
                        }
                        Err(abort_err) => {
                            tracing::warn!(run_id = %run.id, error = %abort_err, "Failed to abort Apify run")
                        }
                    }
                }
                return Err(e);
            }
        };
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }

    /// Search X/Twitter for the newest tweets matching any of `terms`.
    pub async fn search_tweets(&self, terms: &[&str], limit: u32) -> Result<Vec<Tweet>> {
        tracing::info!(?terms, limit, "Starting X/Twitter keyword search");

        let input = TweetSearchInput {
            search_terms: terms.iter().map(|t| t.to_string()).collect(),
            max_items: limit,
            sort: "Latest".to_string(),
        };

        let tweets: Vec<Tweet> = self.run_actor(TWEET_SCRAPER, &input).await?;
        let tweets: Vec<Tweet> = tweets.into_iter().filter(|t| !t.no_results).collect();
        tracing::info!(count = tweets.len(), "Fetched tweets");

        Ok(tweets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_input_serializes_apify_field_names() {
        let input = TweetSearchInput {
            search_terms: vec!["Olipop".to_string()],
            max_items: 25,
            sort: "Latest".to_string(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["searchTerms"][0], "Olipop");
        assert_eq!(json["maxItems"], 25);
        assert_eq!(json["sort"], "Latest");
    }

    #[test]
    fn max_polls_is_at_least_one() {
        let client = ApifyClient::new("token".into()).with_max_polls(0);
        assert_eq!(client.max_polls, 1);
    }

    #[test]
    fn run_timeout_bounds_the_poll_phase() {
        let client = ApifyClient::new("token".into()).with_run_timeout(Duration::from_secs(120));
        assert_eq!(client.wait_secs, 60);
        assert_eq!(client.max_polls, 2);
        assert_eq!(client.poll_budget(), Duration::from_secs(120));

        let short = ApifyClient::new("token".into()).with_run_timeout(Duration::from_secs(20));
        assert_eq!(short.wait_secs, 20);
        assert_eq!(short.max_polls, 1);
        assert!(short.poll_budget() <= Duration::from_secs(20));
    }

    #[test]
    fn deadline_covers_every_poll_and_the_abort() {
        for secs in [1, 20, 59, 60, 61, 120, 300] {
            let client = ApifyClient::new("token".into()).with_run_timeout(Duration::from_secs(secs));
            let per_poll = Duration::from_secs(client.wait_secs + POLL_SLACK_SECS);
            assert!(client.run_deadline() >= per_poll * client.max_polls + REQUEST_TIMEOUT * 2);
            assert!(client.run_deadline() > client.poll_budget());
        }
    }
}
