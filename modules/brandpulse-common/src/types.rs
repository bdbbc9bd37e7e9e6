use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;

// --- Source Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Reddit,
    Twitter,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SourceType {
    /// Parse a source name as accepted by the `sources` query parameter.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reddit" => Some(SourceType::Reddit),
            "twitter" | "x" => Some(SourceType::Twitter),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Reddit => write!(f, "reddit"),
            SourceType::Twitter => write!(f, "twitter"),
            SourceType::Unknown => write!(f, "unknown"),
        }
    }
}

// --- Metadata keys written by source adapters ---

pub const META_CREATED_AT: &str = "createdAt";
pub const META_REDDIT_SCORE: &str = "redditScore";
pub const META_REDDIT_NUM_COMMENTS: &str = "redditNumComments";
pub const META_REDDIT_SUBREDDIT: &str = "redditSubreddit";
pub const META_TWITTER_LIKE_COUNT: &str = "twitterLikeCount";
pub const META_TWITTER_RETWEET_COUNT: &str = "twitterRetweetCount";
pub const META_TWITTER_REPLY_COUNT: &str = "twitterReplyCount";
pub const META_QUORA_VIEWS: &str = "quoraViews";

/// Popularity signals in lookup order. The first numeric one wins.
pub const POPULARITY_KEYS: &[&str] = &[META_REDDIT_SCORE, META_TWITTER_LIKE_COUNT, META_QUORA_VIEWS];

// --- Canonical Mention ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Option<String>,
    pub name: Option<String>,
    pub profile_url: Option<String>,
}

/// Container the mention belongs to (subreddit, conversation thread).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Source-specific fields plus the mandatory creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionMetadata {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MentionMetadata {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            extra: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(Value::as_f64)
    }

    /// Best-available popularity signal, floored at zero. 0 when none is present.
    pub fn popularity(&self) -> f64 {
        POPULARITY_KEYS
            .iter()
            .find_map(|k| self.get_f64(k))
            .map(|p| p.max(0.0))
            .unwrap_or(0.0)
    }
}

/// One piece of user-generated content referencing a brand, normalized
/// across platforms. Core fields are fixed at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub id: String,
    pub source_type: SourceType,
    pub source_identifier: String,
    pub url: String,
    pub text: String,
    pub title: Option<String>,
    pub author: Option<Author>,
    pub parent: Option<ParentRef>,
    pub metadata: MentionMetadata,
    pub fetched_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

pub const UNKNOWN_IDENTIFIER: &str = "unknown";
pub const NO_LINK: &str = "#";

impl Mention {
    pub fn builder() -> NewMentionBuilder {
        NewMention::builder()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.metadata.created_at
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Same record under a timestamped id, used when `{source}_{identifier}`
    /// collides within one aggregation run.
    pub fn with_fallback_id(mut self, attempt: u32) -> Self {
        let base = fallback_id(
            self.source_type,
            &self.source_identifier,
            self.fetched_at,
        );
        self.id = if attempt == 0 {
            base
        } else {
            format!("{base}_{attempt}")
        };
        self
    }
}

fn fallback_id(source_type: SourceType, identifier: &str, fetched_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        source_type,
        identifier,
        fetched_at.timestamp_millis()
    )
}

/// Draft of a [`Mention`]. Every field is optional; `build()` applies the
/// canonical defaults.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(build_method(into = Mention))]
pub struct NewMention {
    #[builder(default, setter(into, strip_option))]
    pub id: Option<String>,
    #[builder(default)]
    pub source_type: SourceType,
    #[builder(default, setter(into, strip_option))]
    pub source_identifier: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub url: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub text: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub title: Option<String>,
    #[builder(default, setter(strip_option))]
    pub author: Option<Author>,
    #[builder(default, setter(strip_option))]
    pub parent: Option<ParentRef>,
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub metadata: Map<String, Value>,
    #[builder(default, setter(strip_option))]
    pub fetched_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub tags: Vec<String>,
}

impl From<NewMention> for Mention {
    fn from(draft: NewMention) -> Self {
        let fetched_at = draft.fetched_at.unwrap_or_else(Utc::now);
        let has_identifier = draft
            .source_identifier
            .as_deref()
            .is_some_and(|s| !s.is_empty());
        let source_identifier = draft
            .source_identifier
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string());

        let id = match draft.id.filter(|s| !s.is_empty()) {
            Some(id) => id,
            None if has_identifier => format!("{}_{}", draft.source_type, source_identifier),
            // Without a native id, `{source}_unknown` would collide for every record.
            None => fallback_id(draft.source_type, &source_identifier, fetched_at),
        };

        let mut extra = draft.metadata;
        extra.remove(META_CREATED_AT);

        Mention {
            id,
            source_type: draft.source_type,
            source_identifier,
            url: draft
                .url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| NO_LINK.to_string()),
            text: draft.text.unwrap_or_default(),
            title: draft.title,
            author: draft.author,
            parent: draft.parent,
            metadata: MentionMetadata {
                created_at: draft.created_at.unwrap_or(fetched_at),
                extra,
            },
            fetched_at,
            tags: draft.tags,
        }
    }
}

// --- Analysis ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Pending,
}

impl Sentiment {
    /// Case-insensitive parse of a model-supplied label.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            "pending" => Some(Sentiment::Pending),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
            Sentiment::Neutral => write!(f, "Neutral"),
            Sentiment::Pending => write!(f, "Pending"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

pub const TONE_UNKNOWN: &str = "Unknown";
pub const TONE_API_ERROR: &str = "API Error";
pub const TONE_PARSE_ERROR: &str = "Parse Error";
pub const EMPTY_TEXT_ERROR: &str = "Empty text provided";

/// Why an analysis fell back to safe defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedKind {
    /// The backend call failed (timeout, auth, quota, transport).
    Api,
    /// The backend answered but no usable object could be parsed.
    Parse,
}

impl DegradedKind {
    pub fn label(self) -> &'static str {
        match self {
            DegradedKind::Api => TONE_API_ERROR,
            DegradedKind::Parse => TONE_PARSE_ERROR,
        }
    }
}

/// Structured signals extracted from one mention's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
    /// 0.0 = very negative, 1.0 = very positive.
    pub sentiment_score: f64,
    pub tone: String,
    pub intent: String,
    pub key_phrases: Vec<String>,
    pub risk_level: Option<RiskLevel>,
    pub is_offensive: bool,
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Fixed result for empty or whitespace-only text. No backend is consulted.
    pub fn empty_text() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.5,
            tone: TONE_UNKNOWN.to_string(),
            intent: TONE_UNKNOWN.to_string(),
            key_phrases: Vec::new(),
            risk_level: Some(RiskLevel::Low),
            is_offensive: false,
            error: Some(EMPTY_TEXT_ERROR.to_string()),
        }
    }

    /// Safe fallback after a failed or unparseable backend call. Medium risk
    /// keeps a failed analysis from hiding a risky mention.
    pub fn degraded(kind: DegradedKind, error: impl Into<String>) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.5,
            tone: kind.label().to_string(),
            intent: kind.label().to_string(),
            key_phrases: Vec::new(),
            risk_level: Some(RiskLevel::Medium),
            is_offensive: false,
            error: Some(error.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

// --- Enriched Mention (pipeline output) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMention {
    #[serde(flatten)]
    pub mention: Mention,
    pub sentiment: Sentiment,
    pub sentiment_score: Option<f64>,
    pub tone: String,
    pub intent: String,
    pub key_phrases: Vec<String>,
    pub risk_score: u8,
    pub risk_level: Option<RiskLevel>,
    pub is_offensive: Option<bool>,
    pub analysis_error: Option<String>,
}

impl EnrichedMention {
    pub fn new(mention: Mention, analysis: AnalysisResult, risk_score: u8) -> Self {
        Self {
            mention,
            sentiment: analysis.sentiment,
            sentiment_score: Some(analysis.sentiment_score),
            tone: analysis.tone,
            intent: analysis.intent,
            key_phrases: analysis.key_phrases,
            risk_score: risk_score.min(100),
            risk_level: analysis.risk_level,
            is_offensive: Some(analysis.is_offensive),
            analysis_error: analysis.error,
        }
    }

    pub fn id(&self) -> &str {
        &self.mention.id
    }
}

// --- Reply drafting ---

/// What the reply assistant knows about a mention. Lenient on input: every
/// field but `text` may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyContext {
    pub text: String,
    #[serde(alias = "source")]
    pub source_type: Option<String>,
    pub sentiment: Option<String>,
    pub sentiment_score: Option<f64>,
    pub tone: Option<String>,
    pub intent: Option<String>,
    pub key_phrases: Vec<String>,
    #[serde(alias = "geminiRiskLevel")]
    pub risk_level: Option<String>,
    pub risk_score: Option<u8>,
    pub url: Option<String>,
    pub author_name: Option<String>,
}

impl From<&EnrichedMention> for ReplyContext {
    fn from(m: &EnrichedMention) -> Self {
        Self {
            text: m.mention.text.clone(),
            source_type: Some(m.mention.source_type.to_string()),
            sentiment: Some(m.sentiment.to_string()),
            sentiment_score: m.sentiment_score,
            tone: Some(m.tone.clone()),
            intent: Some(m.intent.clone()),
            key_phrases: m.key_phrases.clone(),
            risk_level: m.risk_level.map(|r| r.to_string()),
            risk_score: Some(m.risk_score),
            url: Some(m.mention.url.clone()).filter(|u| u != NO_LINK),
            author_name: m.mention.author.as_ref().and_then(|a| a.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub suggestion: String,
    pub strategy: String,
    /// Set when the model ignored the JSON format and its raw text was used.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

// --- Brand verification ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandVerification {
    pub is_brand: bool,
    pub brand_name: String,
}
