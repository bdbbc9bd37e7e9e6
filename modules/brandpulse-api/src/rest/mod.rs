use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use brandpulse_common::{BrandPulseError, ReplyContext};
use brandpulse_scout::assist::MISSING_CONTEXT_ERROR;

use crate::AppState;

/// Set on rate-limited (sequential) analysis runs: expected analysis time.
pub const ANALYSIS_ESTIMATE_HEADER: HeaderName = HeaderName::from_static("x-analysis-estimate-ms");
/// Set on rate-limited runs: `sequential`.
pub const ANALYSIS_MODE_HEADER: HeaderName = HeaderName::from_static("x-analysis-mode");

// --- Request types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionsQuery {
    brand_query: Option<String>,
    /// Comma-separated source names, e.g. `reddit,twitter`.
    sources: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistRequest {
    mention_id: Option<String>,
    mention_context: Option<ReplyContext>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    query: Option<String>,
}

// --- Helpers ---

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn error_response(err: BrandPulseError) -> Response {
    if err.is_client_error() {
        return error_json(StatusCode::BAD_REQUEST, err.to_string());
    }
    warn!(error = %err, "Request failed");
    error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn parse_sources(raw: Option<&str>) -> Option<Vec<String>> {
    let names: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

// --- Handlers ---

pub async fn api_mentions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MentionsQuery>,
) -> Response {
    let Some(query) = params
        .brand_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        return error_json(StatusCode::BAD_REQUEST, "Brand query is required");
    };
    let sources = parse_sources(params.sources.as_deref());

    match state.pipeline.rank_mentions(query, sources.as_deref()).await {
        Ok(ranked) => {
            let slow = ranked.is_rate_limited();
            let estimate_ms = ranked.estimated_analysis.as_millis();
            let mut response = Json(ranked.mentions).into_response();
            if slow {
                let headers = response.headers_mut();
                headers.insert(ANALYSIS_MODE_HEADER, HeaderValue::from_static("sequential"));
                headers.insert(ANALYSIS_ESTIMATE_HEADER, HeaderValue::from(estimate_ms as u64));
            }
            response
        }
        Err(e) => error_response(e),
    }
}

pub async fn api_assist(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AssistRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return error_json(StatusCode::BAD_REQUEST, MISSING_CONTEXT_ERROR);
    };
    let Some(context) = body.mention_context else {
        return error_json(StatusCode::BAD_REQUEST, MISSING_CONTEXT_ERROR);
    };

    info!(mention_id = body.mention_id.as_deref().unwrap_or("-"), "Reply assistance requested");
    match state.assistant.draft_reply(&context).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn api_verify_brand(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(VerifyRequest { query: Some(q) })) => q,
        _ => String::new(),
    };

    match state.verifier.verify(&query).await {
        Ok(verification) => Json(verification).into_response(),
        Err(e) => error_response(e),
    }
}
