use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use brandpulse_common::{AnalysisMode, BrandPulseError, Config, EnrichedMention, Mention};

use crate::aggregator::Aggregator;
use crate::analyzer::TextAnalyzer;
use crate::scorer::RiskScorer;

/// How per-mention analysis is dispatched. Chosen from configuration, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStrategy {
    /// Analyze concurrently. `None` means no cap.
    Parallel { max_in_flight: Option<usize> },
    /// Analyze one mention at a time, waiting `delay` between dispatches.
    Sequential { delay: Duration },
}

impl Default for AnalysisStrategy {
    fn default() -> Self {
        AnalysisStrategy::Parallel { max_in_flight: None }
    }
}

impl AnalysisStrategy {
    pub fn from_config(config: &Config) -> Self {
        match config.analysis_mode {
            AnalysisMode::Parallel => AnalysisStrategy::Parallel {
                max_in_flight: config.analysis_max_in_flight,
            },
            AnalysisMode::Sequential => AnalysisStrategy::Sequential {
                delay: config.analysis_delay,
            },
        }
    }
}

/// Ranked output plus the analysis latency the caller should expect.
#[derive(Debug, Clone)]
pub struct RankedMentions {
    pub mentions: Vec<EnrichedMention>,
    /// `delay × n` for sequential analysis, zero otherwise. Non-zero marks
    /// the request as a slow, rate-limited operation.
    pub estimated_analysis: Duration,
}

impl RankedMentions {
    pub fn is_rate_limited(&self) -> bool {
        !self.estimated_analysis.is_zero()
    }
}

/// Fetch, analyze, score, and rank mentions for one brand query.
#[derive(Clone, TypedBuilder)]
pub struct Pipeline {
    aggregator: Aggregator,
    analyzer: Arc<dyn TextAnalyzer>,
    #[builder(default)]
    scorer: RiskScorer,
    #[builder(default)]
    strategy: AnalysisStrategy,
}

impl Pipeline {
    /// Lower bound on analysis wall time for `mentions` items. Zero unless
    /// the strategy is sequential.
    pub fn estimated_analysis_duration(&self, mentions: usize) -> Duration {
        match self.strategy {
            AnalysisStrategy::Sequential { delay } => {
                delay.saturating_mul(u32::try_from(mentions).unwrap_or(u32::MAX))
            }
            AnalysisStrategy::Parallel { .. } => Duration::ZERO,
        }
    }

    /// Ranked mentions for `query`, highest risk first.
    ///
    /// Only a blank query is an error. Source and analysis failures show up
    /// as missing or degraded mentions.
    pub async fn get_ranked_mentions(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Result<Vec<EnrichedMention>, BrandPulseError> {
        Ok(self.rank_mentions(query, sources).await?.mentions)
    }

    /// [`get_ranked_mentions`](Self::get_ranked_mentions) plus the analysis
    /// estimate, for callers that report slow runs.
    pub async fn rank_mentions(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Result<RankedMentions, BrandPulseError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(BrandPulseError::Validation("query required".to_string()));
        }

        let mentions = self.aggregator.fetch_mentions_from_sources(query, sources).await;
        if mentions.is_empty() {
            info!(query, "No mentions found");
            return Ok(RankedMentions {
                mentions: Vec::new(),
                estimated_analysis: Duration::ZERO,
            });
        }

        let estimated_analysis = self.estimated_analysis_duration(mentions.len());
        let mut enriched = self.enrich(mentions).await;

        let degraded = enriched.iter().filter(|m| m.analysis_error.is_some()).count();
        // Stable: equal scores keep aggregator (recency) order.
        enriched.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

        info!(query, count = enriched.len(), degraded, "Ranked mentions");
        Ok(RankedMentions {
            mentions: enriched,
            estimated_analysis,
        })
    }

    /// Analyze and score every mention. Output order matches input order.
    async fn enrich(&self, mentions: Vec<Mention>) -> Vec<EnrichedMention> {
        match self.strategy {
            AnalysisStrategy::Parallel { max_in_flight } => {
                let limit = max_in_flight.unwrap_or(mentions.len()).max(1);
                stream::iter(mentions.into_iter().map(|m| self.enrich_one(m)))
                    .buffered(limit)
                    .collect()
                    .await
            }
            AnalysisStrategy::Sequential { delay } => {
                let eta = self.estimated_analysis_duration(mentions.len());
                info!(
                    count = mentions.len(),
                    delay_ms = delay.as_millis() as u64,
                    eta_secs = eta.as_secs(),
                    "Analyzing sequentially for a rate-limited backend"
                );

                let mut out = Vec::with_capacity(mentions.len());
                for (i, mention) in mentions.into_iter().enumerate() {
                    if i > 0 && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    out.push(self.enrich_one(mention).await);
                }
                out
            }
        }
    }

    async fn enrich_one(&self, mention: Mention) -> EnrichedMention {
        let analysis = self.analyzer.analyze(&mention.text).await;
        if let Some(ref e) = analysis.error {
            if mention.has_text() {
                warn!(mention_id = mention.id.as_str(), error = e.as_str(), "Analysis degraded");
            }
        }
        let score = self.scorer.score(&mention, &analysis);
        EnrichedMention::new(mention, analysis, score)
    }
}
