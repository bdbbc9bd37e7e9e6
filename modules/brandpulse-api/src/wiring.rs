//! Build pipeline dependencies from configuration.

use std::sync::Arc;

use ai_client::{Claude, Completion, OpenAi};
use apify_client::ApifyClient;
use reddit_client::{RedditClient, RedditCredentials};
use tracing::{info, warn};

use brandpulse_common::{AiProvider, Config};
use brandpulse_scout::{
    Aggregator, AnalysisStrategy, BrandVerifier, LlmAnalyzer, Pipeline, RedditSource,
    ReplyAssistant, RiskScorer, TwitterSource,
};

use crate::AppState;

fn completion(config: &Config, model: &str) -> Arc<dyn Completion> {
    match config.ai_provider {
        AiProvider::OpenAi => Arc::new(
            OpenAi::new(config.ai_api_key.clone(), model).with_timeout(config.ai_timeout),
        ),
        AiProvider::Claude => Arc::new(
            Claude::new(config.ai_api_key.clone(), model).with_timeout(config.ai_timeout),
        ),
    }
}

fn aggregator(config: &Config) -> Aggregator {
    let mut aggregator = Aggregator::new().with_source_timeout(config.source_timeout);

    match &config.reddit {
        Some(reddit) => {
            let client = RedditClient::new(RedditCredentials {
                client_id: reddit.client_id.clone(),
                client_secret: reddit.client_secret.clone(),
                username: reddit.username.clone(),
                password: reddit.password.clone(),
                user_agent: reddit.user_agent.clone(),
            })
            .with_timeout(config.source_timeout);
            aggregator = aggregator.with_source(Arc::new(RedditSource::new(
                client,
                config.source_result_limit,
            )));
        }
        None => warn!("Reddit credentials not set, Reddit source disabled"),
    }

    match &config.apify_api_key {
        Some(key) => {
            aggregator = aggregator.with_source(Arc::new(TwitterSource::new(
                ApifyClient::new(key.clone()).with_run_timeout(config.apify_run_timeout),
                config.source_result_limit,
            )));
        }
        None => warn!("APIFY_API_KEY not set, X/Twitter source disabled"),
    }

    aggregator
}

pub fn build_state(config: &Config) -> AppState {
    let aggregator = aggregator(config);
    let sources = aggregator.source_types();
    if sources.is_empty() {
        warn!("No mention sources configured; every search will return no results");
    }

    let strategy = AnalysisStrategy::from_config(config);
    info!(?sources, ?strategy, "Pipeline configured");

    let pipeline = Pipeline::builder()
        .aggregator(aggregator)
        .analyzer(Arc::new(LlmAnalyzer::new(completion(config, &config.analysis_model))))
        .scorer(RiskScorer::default())
        .strategy(strategy)
        .build();

    let assist_ai = completion(config, &config.assist_model);
    AppState {
        pipeline,
        assistant: ReplyAssistant::new(assist_ai.clone()),
        verifier: BrandVerifier::new(assist_ai),
    }
}
