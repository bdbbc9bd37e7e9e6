use std::sync::Arc;

use ai_client::{Completion, CompletionRequest};
use serde_json::Value;
use tracing::{info, warn};

use brandpulse_common::{BrandPulseError, ReplyContext, ReplyDraft};

use crate::parse::{parse_json_response, Parsed};

const REPLY_TEMPERATURE: f32 = 0.7;

pub const MISSING_CONTEXT_ERROR: &str = "Mention context (including text) is required";

const REPLY_SYSTEM_PROMPT: &str = r#"You are an assistant for a direct-to-consumer brand's social media team.
Draft a reply to an online mention and outline how to handle it.

Keep the brand voice friendly, professional, and helpful.
Never use placeholders such as "[Your Brand Name]" or "[Customer Name]"; write the actual message.

Return a single JSON object with ONLY the keys "suggestion" (string) and "strategy" (string). No other text.
Example: {"suggestion": "We're so sorry to hear about this...", "strategy": "Acknowledge -> Request DM -> Resolve"}"#;

/// Drafts a suggested reply and engagement strategy for one mention.
pub struct ReplyAssistant {
    ai: Arc<dyn Completion>,
}

impl ReplyAssistant {
    pub fn new(ai: Arc<dyn Completion>) -> Self {
        Self { ai }
    }

    pub async fn draft_reply(&self, context: &ReplyContext) -> Result<ReplyDraft, BrandPulseError> {
        if context.text.trim().is_empty() {
            return Err(BrandPulseError::Validation(MISSING_CONTEXT_ERROR.to_string()));
        }

        let request = CompletionRequest::new(build_prompt(context))
            .preamble(REPLY_SYSTEM_PROMPT)
            .temperature(REPLY_TEMPERATURE)
            .max_tokens(800)
            .json_object();

        info!(model = self.ai.model(), "Requesting reply draft");
        let response = self
            .ai
            .complete(request)
            .await
            .map_err(|e| BrandPulseError::Analysis(format!("reply drafting failed: {e}")))?;

        match parse_json_response::<Value>(&response) {
            Parsed::Structured(value) => {
                let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
                match (field("suggestion"), field("strategy")) {
                    (Some(suggestion), Some(strategy)) => Ok(ReplyDraft {
                        suggestion,
                        strategy,
                        degraded: false,
                    }),
                    _ => Err(BrandPulseError::Analysis(
                        "reply response missing 'suggestion' or 'strategy' string properties"
                            .to_string(),
                    )),
                }
            }
            Parsed::Degraded { raw, reason } => {
                if raw.is_empty() {
                    return Err(BrandPulseError::Analysis("empty reply response".to_string()));
                }
                warn!(reason = reason.as_str(), "Reply response was not JSON, using raw text");
                Ok(ReplyDraft {
                    suggestion: raw,
                    strategy: String::new(),
                    degraded: true,
                })
            }
        }
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

fn build_prompt(ctx: &ReplyContext) -> String {
    let platform = ctx
        .source_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("an unspecified platform");
    let score = ctx
        .sentiment_score
        .map(|s| format!("{s:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    let key_phrases = if ctx.key_phrases.is_empty() {
        "N/A".to_string()
    } else {
        ctx.key_phrases.join(", ")
    };
    let risk_score = ctx
        .risk_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"A user posted the following on {platform}:
>>>
"{text}"
>>>

Analysis of the post:
- Sentiment: {sentiment} (Score: {score})
- Tone: {tone}
- Detected Intent: {intent}
- Key Phrases: {key_phrases}
- Assessed Risk Level: {risk_level} (Overall Risk Score: {risk_score})
- Source URL: {url}
- Author: {author}

Provide:
1. Suggested Response: a concise, empathetic, actionable reply suited to {platform}.
   - Complaint or negative: acknowledge the experience, show empathy, offer a clear path to resolution. Avoid public promises you can't keep.
   - Question: answer directly if possible, or point to where the answer is.
   - Positive: thank the user warmly.
   - Neutral or unclear: offer help or ask a clarifying question.
2. Engagement Strategy: the key steps for handling this specific mention."#,
        text = ctx.text.trim(),
        sentiment = or_na(ctx.sentiment.as_deref()),
        tone = or_na(ctx.tone.as_deref()),
        intent = or_na(ctx.intent.as_deref()),
        risk_level = or_na(ctx.risk_level.as_deref()),
        url = or_na(ctx.url.as_deref()),
        author = or_na(ctx.author_name.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;

    fn context(text: &str) -> ReplyContext {
        ReplyContext {
            text: text.to_string(),
            source_type: Some("reddit".into()),
            sentiment: Some("Negative".into()),
            sentiment_score: Some(0.125),
            key_phrases: vec!["flat".into(), "refund".into()],
            risk_score: Some(72),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_call() {
        let ai = Arc::new(ScriptedCompletion::always("{}"));
        let err = ReplyAssistant::new(ai.clone())
            .draft_reply(&context("  "))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), MISSING_CONTEXT_ERROR);
        assert_eq!(ai.calls(), 0);
    }

    #[tokio::test]
    async fn json_reply_is_returned() {
        let ai = Arc::new(ScriptedCompletion::always(
            r#"{"suggestion": "So sorry! DM us your order number.", "strategy": "Acknowledge -> DM -> Resolve"}"#,
        ));
        let draft = ReplyAssistant::new(ai.clone())
            .draft_reply(&context("My can was flat, I want a refund"))
            .await
            .unwrap();
        assert_eq!(draft.suggestion, "So sorry! DM us your order number.");
        assert_eq!(draft.strategy, "Acknowledge -> DM -> Resolve");
        assert!(!draft.degraded);

        let prompt = &ai.prompts()[0];
        assert!(prompt.contains("on reddit"));
        assert!(prompt.contains("(Score: 0.13)") || prompt.contains("(Score: 0.12)"));
        assert!(prompt.contains("Key Phrases: flat, refund"));
        assert!(prompt.contains("Overall Risk Score: 72"));
        assert!(prompt.contains("Author: N/A"));
    }

    #[tokio::test]
    async fn prose_reply_becomes_degraded_suggestion() {
        let ai = Arc::new(ScriptedCompletion::always("Thanks so much for the kind words!"));
        let draft = ReplyAssistant::new(ai)
            .draft_reply(&context("love it"))
            .await
            .unwrap();
        assert_eq!(draft.suggestion, "Thanks so much for the kind words!");
        assert_eq!(draft.strategy, "");
        assert!(draft.degraded);
    }

    #[tokio::test]
    async fn json_without_required_strings_is_an_error() {
        let ai = Arc::new(ScriptedCompletion::always(r#"{"suggestion": 5}"#));
        let err = ReplyAssistant::new(ai)
            .draft_reply(&context("love it"))
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn backend_failure_is_an_error() {
        let ai = Arc::new(ScriptedCompletion::failing(500));
        let err = ReplyAssistant::new(ai)
            .draft_reply(&context("love it"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reply drafting failed"));
    }
}
