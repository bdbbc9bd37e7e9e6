use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use brandpulse_common::{Mention, SourceType};

use crate::sources::{fetch_mentions, MentionSource};

const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Fans a query out to registered sources and merges what comes back.
#[derive(Clone)]
pub struct Aggregator {
    sources: Vec<Arc<dyn MentionSource>>,
    source_timeout: Duration,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn MentionSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Upper bound for one adapter's full search (auth included).
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn source_types(&self) -> Vec<SourceType> {
        self.sources.iter().map(|s| s.source_type()).collect()
    }

    fn select(&self, names: Option<&[String]>) -> Vec<Arc<dyn MentionSource>> {
        let Some(names) = names else {
            return self.sources.clone();
        };

        let mut wanted = HashSet::new();
        for name in names {
            match SourceType::from_name(name) {
                Some(kind) => {
                    wanted.insert(kind);
                }
                None => warn!(source = name.as_str(), "Unknown source requested, skipping"),
            }
        }
        for kind in &wanted {
            if !self.sources.iter().any(|s| s.source_type() == *kind) {
                warn!(source = %kind, "Requested source is not configured");
            }
        }

        self.sources
            .iter()
            .filter(|s| wanted.contains(&s.source_type()))
            .cloned()
            .collect()
    }

    /// Query every selected source concurrently and return all mentions,
    /// newest first. `None` selects every registered source.
    ///
    /// Never fails: a failing, timed-out, or panicking source contributes
    /// nothing.
    pub async fn fetch_mentions_from_sources(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Vec<Mention> {
        let selected = self.select(sources);
        if selected.is_empty() {
            warn!(query, "No sources selected, nothing to fetch");
            return Vec::new();
        }

        let handles = selected.into_iter().map(|source| {
            let query = query.to_string();
            let timeout = self.source_timeout;
            let kind = source.source_type();
            let handle = tokio::spawn(async move {
                fetch_mentions(source.as_ref(), &query, timeout).await
            });
            (kind, handle)
        });
        let (kinds, handles): (Vec<_>, Vec<_>) = handles.unzip();

        let mut mentions = Vec::new();
        for (kind, result) in kinds.into_iter().zip(join_all(handles).await) {
            match result {
                Ok(batch) => mentions.extend(batch),
                Err(e) => warn!(source = %kind, error = %e, "Source task aborted, contributing no mentions"),
            }
        }

        let mut mentions = ensure_unique_ids(mentions);
        // Stable: ties keep adapter registration order.
        mentions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        info!(query, total = mentions.len(), "Aggregated mentions");
        mentions
    }
}

/// Give every colliding id a timestamped fallback, adding an attempt
/// suffix while that still collides.
fn ensure_unique_ids(mentions: Vec<Mention>) -> Vec<Mention> {
    let mut seen: HashSet<String> = HashSet::with_capacity(mentions.len());
    mentions
        .into_iter()
        .map(|mention| {
            if seen.insert(mention.id.clone()) {
                return mention;
            }
            let mut attempt = 0;
            loop {
                let candidate = mention.clone().with_fallback_id(attempt);
                if seen.insert(candidate.id.clone()) {
                    return candidate;
                }
                attempt += 1;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn mention(id: &str) -> Mention {
        Mention::builder()
            .source_type(SourceType::Reddit)
            .source_identifier(id)
            .text("x")
            .fetched_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn colliding_ids_get_fallbacks() {
        let out = ensure_unique_ids(vec![mention("a"), mention("a"), mention("a"), mention("b")]);
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        let millis = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(
            ids,
            vec![
                "reddit_a".to_string(),
                format!("reddit_a_{millis}"),
                format!("reddit_a_{millis}_1"),
                "reddit_b".to_string(),
            ]
        );
    }
}
