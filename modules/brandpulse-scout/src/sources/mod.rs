//! Source adapters: one per platform, each producing canonical [`Mention`]s.

pub mod reddit;
pub mod twitter;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use brandpulse_common::{Mention, SourceType};

pub use reddit::RedditSource;
pub use twitter::TwitterSource;

/// Authenticated keyword search against one platform.
///
/// Implementations return hard errors; [`fetch_mentions`] is the soft-failing
/// boundary the aggregator calls.
#[async_trait]
pub trait MentionSource: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Own upper bound for a search, replacing the aggregator default.
    /// Adapters that bound and clean up their work internally return a
    /// deadline covering that, so the outer cut-off never preempts it.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn search(&self, query: &str) -> Result<Vec<Mention>>;
}

/// Run one adapter under its own timeout, or `default_timeout`. Any failure
/// is logged and becomes an empty list so a broken source never aborts
/// aggregation.
pub async fn fetch_mentions(
    source: &dyn MentionSource,
    query: &str,
    default_timeout: Duration,
) -> Vec<Mention> {
    let kind = source.source_type();
    let timeout = source.timeout().unwrap_or(default_timeout);
    info!(source = %kind, query, "Fetching mentions");

    match tokio::time::timeout(timeout, source.search(query)).await {
        Ok(Ok(mentions)) => {
            let total = mentions.len();
            let mentions: Vec<Mention> = mentions.into_iter().filter(Mention::has_text).collect();
            if mentions.len() < total {
                info!(source = %kind, dropped = total - mentions.len(), "Dropped mentions without text");
            }
            info!(source = %kind, count = mentions.len(), "Source returned mentions");
            mentions
        }
        Ok(Err(e)) => {
            warn!(source = %kind, error = %e, "Source failed, contributing no mentions");
            Vec::new()
        }
        Err(_) => {
            warn!(source = %kind, timeout_secs = timeout.as_secs_f64(), "Source timed out, contributing no mentions");
            Vec::new()
        }
    }
}
