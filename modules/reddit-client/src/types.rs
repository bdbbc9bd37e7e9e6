use serde::Deserialize;

/// Response body of `POST /api/v1/access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the token expires. Reddit issues one-hour tokens.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Reddit "Listing" envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
    pub after: Option<String>,
}

/// A typed Reddit object (`kind` is `t3` for links/posts).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: Option<String>,
    pub data: Option<T>,
}

/// A single post from `/search`. Every field is optional; Reddit omits or
/// nulls fields for deleted and removed content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditPost {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub permalink: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub author_fullname: Option<String>,
    /// Unix epoch seconds (Reddit returns a float).
    pub created_utc: Option<f64>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub upvote_ratio: Option<f64>,
    pub subreddit: Option<String>,
    pub subreddit_name_prefixed: Option<String>,
    pub over_18: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_listing() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_abc",
                "children": [
                    {"kind": "t3", "data": {
                        "id": "abc",
                        "title": "Anyone tried Olipop?",
                        "selftext": "",
                        "permalink": "/r/soda/comments/abc/anyone_tried_olipop/",
                        "author": "fizzfan",
                        "created_utc": 1718000000.0,
                        "score": 42,
                        "num_comments": 7,
                        "subreddit_name_prefixed": "r/soda"
                    }}
                ]
            }
        }"#;
        let listing: Listing<RedditPost> = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        let post = listing.data.children[0].data.as_ref().unwrap();
        assert_eq!(post.id.as_deref(), Some("abc"));
        assert_eq!(post.score, Some(42));
        assert_eq!(post.created_utc, Some(1718000000.0));
    }

    #[test]
    fn null_fields_are_tolerated() {
        let raw = r#"{"data": {"children": [{"kind": "t3", "data": {"id": "x", "selftext": null, "author_fullname": null}}]}}"#;
        let listing: Listing<RedditPost> = serde_json::from_str(raw).unwrap();
        let post = listing.data.children[0].data.as_ref().unwrap();
        assert!(post.selftext.is_none());
        assert!(post.author_fullname.is_none());
    }

    #[test]
    fn token_expiry_defaults_to_an_hour() {
        let token: AccessToken = serde_json::from_str(r#"{"access_token": "tok"}"#).unwrap();
        assert_eq!(token.expires_in, 3600);
    }
}
