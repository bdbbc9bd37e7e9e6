use std::sync::Arc;

use ai_client::{truncate_to_char_boundary, Completion, CompletionRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use brandpulse_common::{AnalysisResult, DegradedKind, RiskLevel, Sentiment, TONE_UNKNOWN};

use crate::parse::{parse_json_response, Parsed};

/// Longest mention body sent to the backend, in bytes.
const MAX_INPUT_BYTES: usize = 8_000;

const ANALYSIS_TEMPERATURE: f32 = 0.2;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You analyze social media posts that mention a brand, for a brand reputation team.

Return a single JSON object with exactly these fields and no others:
- "sentiment": one of "Positive", "Negative", "Neutral"
- "sentimentScore": number from 0.0 (very negative) to 1.0 (very positive)
- "tone": one or two words describing the emotional tone (e.g. "Frustrated", "Excited", "Sarcastic")
- "intent": one or two words describing what the author is doing (e.g. "Complaint", "Question", "Praise", "Recommendation")
- "keyPhrases": array of 3 to 5 short phrases from the post
- "riskLevel": one of "Low", "Medium", "High", judged from negativity, urgency and potential for reputational damage
- "isOffensive": true if the post contains hate speech, vulgarity or personal attacks, otherwise false

Respond with the JSON object only."#;

/// Extracts structured signals from one mention's text.
///
/// Never fails: backend and parse problems come back as a degraded
/// [`AnalysisResult`] with `error` set.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> AnalysisResult;
}

/// Analyzer over any chat-completion backend.
pub struct LlmAnalyzer {
    ai: Arc<dyn Completion>,
}

impl LlmAnalyzer {
    pub fn new(ai: Arc<dyn Completion>) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl TextAnalyzer for LlmAnalyzer {
    async fn analyze(&self, text: &str) -> AnalysisResult {
        if text.trim().is_empty() {
            return AnalysisResult::empty_text();
        }

        let body = truncate_to_char_boundary(text, MAX_INPUT_BYTES);
        let request = CompletionRequest::new(format!("Post:\n\"\"\"\n{body}\n\"\"\""))
            .preamble(ANALYSIS_SYSTEM_PROMPT)
            .temperature(ANALYSIS_TEMPERATURE)
            .max_tokens(400)
            .json_object();

        let response = match self.ai.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                if e.is_rate_limited() {
                    warn!(model = self.ai.model(), error = %e, "Analysis rate limited; consider ANALYSIS_MODE=sequential");
                } else {
                    warn!(model = self.ai.model(), error = %e, "Analysis request failed");
                }
                return AnalysisResult::degraded(DegradedKind::Api, e.to_string());
            }
        };

        match parse_json_response::<RawAnalysis>(&response) {
            Parsed::Structured(raw) => raw.into_result(),
            Parsed::Degraded { raw, reason } => {
                warn!(reason = reason.as_str(), "Analysis response unparseable");
                debug!(response = truncate_to_char_boundary(&raw, 500), "Raw analysis response");
                AnalysisResult::degraded(DegradedKind::Parse, reason)
            }
        }
    }
}

/// Model output as received. Every field is optional and loosely typed;
/// [`RawAnalysis::into_result`] normalizes it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    sentiment: Option<String>,
    sentiment_score: Option<Value>,
    tone: Option<String>,
    intent: Option<String>,
    key_phrases: Vec<Value>,
    risk_level: Option<String>,
    is_offensive: Option<Value>,
}

impl RawAnalysis {
    fn into_result(self) -> AnalysisResult {
        let sentiment = self
            .sentiment
            .as_deref()
            .and_then(Sentiment::parse)
            .filter(|s| *s != Sentiment::Pending)
            .unwrap_or(Sentiment::Neutral);

        let sentiment_score = self
            .sentiment_score
            .as_ref()
            .and_then(number)
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 1.0))
            .unwrap_or(0.5);

        let key_phrases = self
            .key_phrases
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect();

        AnalysisResult {
            sentiment,
            sentiment_score,
            tone: label_or_unknown(self.tone),
            intent: label_or_unknown(self.intent),
            key_phrases,
            risk_level: self.risk_level.as_deref().and_then(RiskLevel::parse),
            is_offensive: self.is_offensive.as_ref().is_some_and(truthy),
            error: None,
        }
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn label_or_unknown(label: Option<String>) -> String {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| TONE_UNKNOWN.to_string())
}
