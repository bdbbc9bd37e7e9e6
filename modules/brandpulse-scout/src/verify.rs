use std::sync::Arc;

use ai_client::{Completion, CompletionRequest};
use serde_json::Value;
use tracing::info;

use brandpulse_common::{BrandPulseError, BrandVerification};

use crate::parse::{parse_json_response, Parsed};

pub const INVALID_QUERY_ERROR: &str = "A valid search query is required.";

const VERIFY_SYSTEM_PROMPT: &str = r#"You verify brand names. Decide whether the given search term is a real brand, company, or product.
Respond with a JSON object with ONLY two keys:
- "isBrand": boolean, true if it is a known brand, company, or product
- "brandName": string, the official name if it is a brand, otherwise the original query

Examples:
- "Olipop" -> {"isBrand": true, "brandName": "Olipop"}
- "a funny saying" -> {"isBrand": false, "brandName": "a funny saying"}"#;

/// Single-shot classification of a search term as a brand or not.
pub struct BrandVerifier {
    ai: Arc<dyn Completion>,
}

impl BrandVerifier {
    pub fn new(ai: Arc<dyn Completion>) -> Self {
        Self { ai }
    }

    pub async fn verify(&self, query: &str) -> Result<BrandVerification, BrandPulseError> {
        let query = query.trim();
        if query.chars().filter(|c| !c.is_whitespace()).count() < 2 {
            return Err(BrandPulseError::Validation(INVALID_QUERY_ERROR.to_string()));
        }

        let request = CompletionRequest::new(query)
            .preamble(VERIFY_SYSTEM_PROMPT)
            .temperature(0.1)
            .max_tokens(100)
            .json_object();

        let response = self
            .ai
            .complete(request)
            .await
            .map_err(|e| BrandPulseError::Analysis(format!("brand verification failed: {e}")))?;

        let value = match parse_json_response::<Value>(&response) {
            Parsed::Structured(v) => v,
            Parsed::Degraded { reason, .. } => {
                return Err(BrandPulseError::Analysis(format!(
                    "brand verification response unusable: {reason}"
                )))
            }
        };

        let is_brand = value.get("isBrand").and_then(Value::as_bool).ok_or_else(|| {
            BrandPulseError::Analysis("invalid verification response: 'isBrand' is not a boolean".to_string())
        })?;
        let brand_name = value
            .get("brandName")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(query)
            .to_string();

        info!(query, is_brand, brand_name = brand_name.as_str(), "Brand verified");
        Ok(BrandVerification { is_brand, brand_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;

    #[tokio::test]
    async fn short_query_is_rejected() {
        let ai = Arc::new(ScriptedCompletion::always("{}"));
        let verifier = BrandVerifier::new(ai.clone());
        for q in ["", " a ", "x"] {
            let err = verifier.verify(q).await.unwrap_err();
            assert!(err.is_client_error());
        }
        assert_eq!(ai.calls(), 0);
    }

    #[tokio::test]
    async fn brand_is_recognized() {
        let ai = Arc::new(ScriptedCompletion::always(
            r#"{"isBrand": true, "brandName": "OLIPOP"}"#,
        ));
        let v = BrandVerifier::new(ai.clone()).verify(" olipop ").await.unwrap();
        assert!(v.is_brand);
        assert_eq!(v.brand_name, "OLIPOP");
        assert_eq!(ai.prompts()[0], "olipop");
    }

    #[tokio::test]
    async fn missing_brand_name_echoes_query() {
        let ai = Arc::new(ScriptedCompletion::always(r#"{"isBrand": false}"#));
        let v = BrandVerifier::new(ai).verify("a funny saying").await.unwrap();
        assert!(!v.is_brand);
        assert_eq!(v.brand_name, "a funny saying");
    }

    #[tokio::test]
    async fn non_boolean_is_brand_is_an_error() {
        let ai = Arc::new(ScriptedCompletion::always(r#"{"isBrand": "yes", "brandName": "X"}"#));
        let err = BrandVerifier::new(ai).verify("olipop").await.unwrap_err();
        assert!(err.to_string().contains("isBrand"));
    }
}
