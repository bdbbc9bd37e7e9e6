// Test mocks for the mention pipeline.
//
// One mock per trait boundary:
// - MockSource (MentionSource): fixed mentions, an error, or a panic
// - ScriptedCompletion (ai_client::Completion): canned replies or API errors,
//   with a call counter and the prompts it received
//
// Plus fixed-clock mention fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, Completion, CompletionRequest};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map};

use brandpulse_common::{Mention, SourceType, META_REDDIT_SCORE, META_TWITTER_LIKE_COUNT};

use crate::sources::MentionSource;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Reference "now" for fixtures that need a stable clock.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// A mention created `age` before `now`, with `popularity` stored under the
/// source's native popularity key.
pub fn mention_aged(
    source_type: SourceType,
    identifier: &str,
    text: &str,
    popularity: i64,
    now: DateTime<Utc>,
    age: chrono::Duration,
) -> Mention {
    let mut metadata = Map::new();
    let key = match source_type {
        SourceType::Twitter => META_TWITTER_LIKE_COUNT,
        _ => META_REDDIT_SCORE,
    };
    metadata.insert(key.into(), json!(popularity));

    Mention::builder()
        .source_type(source_type)
        .source_identifier(identifier)
        .text(text)
        .metadata(metadata)
        .created_at(now - age)
        .fetched_at(now)
        .build()
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

enum Behavior {
    Fixed(Vec<Mention>),
    Fail(String),
    Panic,
    Hang,
}

/// Canned adapter. Counts searches so tests can assert fan-out.
pub struct MockSource {
    source_type: SourceType,
    behavior: Behavior,
    delay: Duration,
    timeout: Option<Duration>,
    searches: AtomicUsize,
}

impl MockSource {
    fn with(source_type: SourceType, behavior: Behavior) -> Self {
        Self {
            source_type,
            behavior,
            delay: Duration::ZERO,
            timeout: None,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn fixed(source_type: SourceType, mentions: Vec<Mention>) -> Self {
        Self::with(source_type, Behavior::Fixed(mentions))
    }

    pub fn failing(source_type: SourceType, message: &str) -> Self {
        Self::with(source_type, Behavior::Fail(message.to_string()))
    }

    pub fn panicking(source_type: SourceType) -> Self {
        Self::with(source_type, Behavior::Panic)
    }

    /// Never answers. Only a timeout gets the aggregator past it.
    pub fn hanging(source_type: SourceType) -> Self {
        Self::with(source_type, Behavior::Hang)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report a source-specific timeout, as slow adapters do.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MentionSource for MockSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn search(&self, _query: &str) -> Result<Vec<Mention>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            Behavior::Fixed(mentions) => Ok(mentions.clone()),
            Behavior::Fail(message) => bail!("MockSource: {message}"),
            Behavior::Panic => panic!("MockSource: adapter panicked"),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedCompletion
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Reply {
    Text(String),
    Status(u16),
}

/// Completion backend that replays a script. Once the script runs out the
/// fallback reply is used for every further call.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new(), Reply::Text(reply.to_string()))
    }

    /// Every call fails with an API error carrying `status`.
    pub fn failing(status: u16) -> Self {
        Self::new(Vec::new(), Reply::Status(status))
    }

    /// Replies in order, then repeats `fallback`.
    pub fn sequence(replies: &[&str], fallback: &str) -> Self {
        Self::new(
            replies.iter().map(|r| Reply::Text(r.to_string())).collect(),
            Reply::Text(fallback.to_string()),
        )
    }

    /// Queue an API error as the next reply.
    pub fn then_fail(self, status: u16) -> Self {
        self.script.lock().unwrap().push_back(Reply::Status(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User-turn inputs received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> ai_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.input);

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Status(status) => Err(AiError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}
