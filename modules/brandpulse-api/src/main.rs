use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use brandpulse_common::Config;
use brandpulse_scout::{BrandVerifier, Pipeline, ReplyAssistant};

mod rest;
mod wiring;

pub struct AppState {
    pub pipeline: Pipeline,
    pub assistant: ReplyAssistant,
    pub verifier: BrandVerifier,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // REST API
        .route("/api/mentions", get(rest::api_mentions))
        .route("/api/assist", post(rest::api_assist))
        .route("/api/verify-brand", post(rest::api_verify_brand))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
                .expose_headers([rest::ANALYSIS_MODE_HEADER, rest::ANALYSIS_ESTIMATE_HEADER]),
        )
        // Results are per-query and time-sensitive
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only (brand queries stay out of spans)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("brandpulse=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    config.log_redacted();

    let state = Arc::new(wiring::build_state(&config));
    let app = build_router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("BrandPulse API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
