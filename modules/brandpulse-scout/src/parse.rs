//! Best-effort JSON extraction from free-text model output.

use ai_client::extract_json_object;
use serde::de::DeserializeOwned;

/// Outcome of parsing a model response. Callers branch on the variant
/// instead of handling an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Structured(T),
    /// No usable object. `raw` is the trimmed response text.
    Degraded { raw: String, reason: String },
}

impl<T> Parsed<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, Parsed::Structured(_))
    }
}

/// Locate an object (fenced block, then brace matching) and deserialize it.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Parsed<T> {
    let raw = response.trim();
    let Some(candidate) = extract_json_object(raw) else {
        return Parsed::Degraded {
            raw: raw.to_string(),
            reason: "no JSON object in response".to_string(),
        };
    };

    match serde_json::from_str(candidate) {
        Ok(value) => Parsed::Structured(value),
        Err(e) => Parsed::Degraded {
            raw: raw.to_string(),
            reason: format!("invalid JSON object: {e}"),
        },
    }
}
