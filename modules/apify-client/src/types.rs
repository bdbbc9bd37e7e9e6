use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self.status.as_str(), "FAILED" | "ABORTED" | "TIMED-OUT")
    }
}

// --- X/Twitter (apidojo/tweet-scraper) ---

/// Input for X/Twitter keyword search via apidojo/tweet-scraper.
#[derive(Debug, Clone, Serialize)]
pub struct TweetSearchInput {
    #[serde(rename = "searchTerms")]
    pub search_terms: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
    /// "Latest" or "Top".
    pub sort: String,
}

/// Author info nested inside a Tweet.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetAuthor {
    pub id: Option<String>,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

/// A single tweet from the Apify dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "full_text")]
    pub full_text: Option<String>,
    pub url: Option<String>,
    /// Either Twitter's legacy `Wed Oct 10 20:19:24 +0000 2018` or ISO-8601,
    /// depending on the actor version.
    #[serde(rename = "createdAt", alias = "created_at")]
    pub created_at: Option<String>,
    pub author: Option<TweetAuthor>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(rename = "retweetCount")]
    pub retweet_count: Option<i64>,
    #[serde(rename = "replyCount")]
    pub reply_count: Option<i64>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    /// The actor emits `{"noResults": true}` placeholder items for empty searches.
    #[serde(rename = "noResults", default)]
    pub no_results: bool,
}

impl Tweet {
    /// Returns whichever text field is populated, preferring `full_text`.
    pub fn content(&self) -> Option<&str> {
        self.full_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.text.as_deref())
    }
}
