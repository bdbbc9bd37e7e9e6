use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use apify_client::{ApifyClient, Tweet};
use brandpulse_common::{
    Author, Mention, NewMention, ParentRef, SourceType, META_TWITTER_LIKE_COUNT,
    META_TWITTER_REPLY_COUNT, META_TWITTER_RETWEET_COUNT,
};

use super::MentionSource;

/// Twitter's legacy `created_at` layout, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// X/Twitter keyword search via the Apify tweet scraper.
pub struct TwitterSource {
    client: ApifyClient,
    limit: u32,
}

impl TwitterSource {
    pub fn new(client: ApifyClient, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl MentionSource for TwitterSource {
    fn source_type(&self) -> SourceType {
        SourceType::Twitter
    }

    /// Actor runs poll for longer than a plain HTTP search; the client's
    /// deadline already includes aborting a run that never finishes.
    fn timeout(&self) -> Option<Duration> {
        Some(self.client.run_deadline())
    }

    async fn search(&self, query: &str) -> Result<Vec<Mention>> {
        let tweets = self
            .client
            .search_tweets(&[query], self.limit)
            .await
            .context("X/Twitter search failed")?;

        let fetched_at = Utc::now();
        Ok(tweets
            .into_iter()
            .filter_map(|tweet| tweet_to_mention(tweet, query, fetched_at))
            .collect())
    }
}

fn parse_tweet_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn tweet_to_mention(tweet: Tweet, query: &str, fetched_at: DateTime<Utc>) -> Option<Mention> {
    let text = tweet
        .content()
        .filter(|t| !t.trim().is_empty())?
        .to_string();

    let mut metadata = Map::new();
    for (key, value) in [
        (META_TWITTER_LIKE_COUNT, tweet.like_count),
        (META_TWITTER_RETWEET_COUNT, tweet.retweet_count),
        (META_TWITTER_REPLY_COUNT, tweet.reply_count),
    ] {
        if let Some(v) = value {
            metadata.insert(key.into(), json!(v));
        }
    }

    let handle = tweet.author.as_ref().and_then(|a| a.user_name.clone());
    let author = tweet.author.map(|a| Author {
        id: a.id,
        name: a.user_name.clone().or(a.name),
        profile_url: a
            .url
            .or_else(|| a.user_name.map(|u| format!("https://x.com/{u}"))),
    });

    let url = tweet.url.or_else(|| {
        let id = tweet.id.as_deref()?;
        let handle = handle.as_deref().unwrap_or("i");
        Some(format!("https://x.com/{handle}/status/{id}"))
    });

    // Replies point at the thread's root tweet.
    let parent = tweet
        .conversation_id
        .filter(|c| Some(c) != tweet.id.as_ref())
        .map(|c| ParentRef {
            url: Some(format!("https://x.com/i/status/{c}")),
            id: Some(c),
            title: None,
        });

    let draft = NewMention {
        id: None,
        source_type: SourceType::Twitter,
        source_identifier: tweet.id,
        url,
        text: Some(text),
        title: None,
        author,
        parent,
        created_at: tweet.created_at.as_deref().and_then(parse_tweet_date),
        metadata,
        fetched_at: Some(fetched_at),
        tags: vec![query.to_string()],
    };

    Some(draft.into())
}
