use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use brandpulse_common::{
    Author, Mention, NewMention, ParentRef, SourceType, META_REDDIT_NUM_COMMENTS, META_REDDIT_SCORE,
    META_REDDIT_SUBREDDIT,
};
use reddit_client::{RedditClient, RedditPost};

use super::MentionSource;

const REDDIT_WEB: &str = "https://www.reddit.com";

pub struct RedditSource {
    client: RedditClient,
    limit: u32,
}

impl RedditSource {
    pub fn new(client: RedditClient, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl MentionSource for RedditSource {
    fn source_type(&self) -> SourceType {
        SourceType::Reddit
    }

    async fn search(&self, query: &str) -> Result<Vec<Mention>> {
        let posts = self
            .client
            .search_posts(query, self.limit)
            .await
            .context("Reddit search failed")?;

        let fetched_at = Utc::now();
        Ok(posts
            .into_iter()
            .filter_map(|post| post_to_mention(post, query, fetched_at))
            .collect())
    }
}

/// Map a search hit into a canonical mention. Posts with neither selftext
/// nor title are dropped.
pub fn post_to_mention(post: RedditPost, query: &str, fetched_at: DateTime<Utc>) -> Option<Mention> {
    let text = post
        .selftext
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or(post.title.as_deref())
        .filter(|t| !t.trim().is_empty())?
        .to_string();

    let mut metadata = Map::new();
    if let Some(score) = post.score {
        metadata.insert(META_REDDIT_SCORE.into(), json!(score));
    }
    if let Some(n) = post.num_comments {
        metadata.insert(META_REDDIT_NUM_COMMENTS.into(), json!(n));
    }
    let subreddit = post
        .subreddit_name_prefixed
        .clone()
        .or_else(|| post.subreddit.as_ref().map(|s| format!("r/{s}")));
    if let Some(ref s) = subreddit {
        metadata.insert(META_REDDIT_SUBREDDIT.into(), json!(s));
    }

    let author = post.author.as_ref().map(|name| Author {
        id: post.author_fullname.clone(),
        name: Some(name.clone()),
        profile_url: Some(format!("{REDDIT_WEB}/user/{name}")),
    });

    let parent = subreddit.map(|s| ParentRef {
        id: post.subreddit.clone(),
        url: Some(format!("{REDDIT_WEB}/{s}")),
        title: Some(s),
    });

    let created_at = post
        .created_utc
        .and_then(|secs| DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64));

    let draft = NewMention {
        id: None,
        source_type: SourceType::Reddit,
        source_identifier: post.id,
        url: post.permalink.map(|p| format!("{REDDIT_WEB}{p}")),
        text: Some(text),
        title: post.title,
        author,
        parent,
        created_at,
        metadata,
        fetched_at: Some(fetched_at),
        tags: vec![query.to_string()],
    };

    Some(draft.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post() -> RedditPost {
        RedditPost {
            id: Some("abc".into()),
            title: Some("Anyone tried Olipop?".into()),
            selftext: Some("It tasted flat to me.".into()),
            permalink: Some("/r/soda/comments/abc/anyone_tried_olipop/".into()),
            author: Some("fizzfan".into()),
            author_fullname: Some("t2_xyz".into()),
            created_utc: Some(1_718_000_000.0),
            score: Some(42),
            num_comments: Some(7),
            subreddit: Some("soda".into()),
            subreddit_name_prefixed: Some("r/soda".into()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap()
    }

    #[test]
    fn maps_post_fields() {
        let m = post_to_mention(post(), "olipop", now()).unwrap();
        assert_eq!(m.id, "reddit_abc");
        assert_eq!(m.source_type, SourceType::Reddit);
        assert_eq!(m.text, "It tasted flat to me.");
        assert_eq!(m.title.as_deref(), Some("Anyone tried Olipop?"));
        assert_eq!(
            m.url,
            "https://www.reddit.com/r/soda/comments/abc/anyone_tried_olipop/"
        );
        assert_eq!(m.created_at().timestamp(), 1_718_000_000);
        assert_eq!(m.fetched_at, now());
        assert_eq!(m.tags, vec!["olipop".to_string()]);
        assert_eq!(m.metadata.popularity(), 42.0);
        assert_eq!(m.metadata.get_f64(META_REDDIT_NUM_COMMENTS), Some(7.0));

        let author = m.author.unwrap();
        assert_eq!(author.id.as_deref(), Some("t2_xyz"));
        assert_eq!(author.profile_url.as_deref(), Some("https://www.reddit.com/user/fizzfan"));
        assert_eq!(m.parent.unwrap().title.as_deref(), Some("r/soda"));
    }

    #[test]
    fn title_is_used_when_selftext_is_blank() {
        let mut p = post();
        p.selftext = Some("   ".into());
        let m = post_to_mention(p, "olipop", now()).unwrap();
        assert_eq!(m.text, "Anyone tried Olipop?");
    }

    #[test]
    fn posts_without_text_are_dropped() {
        let mut p = post();
        p.selftext = None;
        p.title = Some(String::new());
        assert!(post_to_mention(p, "olipop", now()).is_none());
    }

    #[test]
    fn missing_timestamp_and_permalink_use_defaults() {
        let mut p = post();
        p.created_utc = None;
        p.permalink = None;
        let m = post_to_mention(p, "olipop", now()).unwrap();
        assert_eq!(m.created_at(), now());
        assert_eq!(m.url, "#");
    }
}
