use chrono::{DateTime, Duration, Utc};

use brandpulse_common::{AnalysisResult, Mention, RiskLevel};

const HIGH_BASE: f64 = 90.0;
const MEDIUM_BASE: f64 = 60.0;
const LOW_BASE: f64 = 30.0;
const DEGRADED_BASE: f64 = 50.0;

const POPULARITY_DIVISOR: f64 = 10.0;
const POPULARITY_CAP: f64 = 10.0;
const DEGRADED_POPULARITY_CAP: f64 = 15.0;

const RECENCY_BONUS: f64 = 5.0;
/// The recency bonus is withheld once a normal-path score reaches this.
const RECENCY_CEILING: f64 = 90.0;

/// Combines analysis signals with popularity and recency into a 0..=100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskScorer {
    recent_window: Duration,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            recent_window: Duration::hours(24),
        }
    }
}

impl RiskScorer {
    pub fn score(&self, mention: &Mention, analysis: &AnalysisResult) -> u8 {
        self.score_at(mention, analysis, Utc::now())
    }

    /// Deterministic for a fixed `now`.
    pub fn score_at(&self, mention: &Mention, analysis: &AnalysisResult, now: DateTime<Utc>) -> u8 {
        let popularity = mention.metadata.popularity();
        // Future timestamps (clock skew) count as recent.
        let is_recent = now - mention.created_at() < self.recent_window;

        let score = if analysis.is_degraded() {
            let mut score = DEGRADED_BASE;
            score += popularity_bonus(popularity, DEGRADED_POPULARITY_CAP);
            if is_recent {
                score += RECENCY_BONUS;
            }
            score
        } else {
            let mut score = match analysis.risk_level {
                Some(RiskLevel::High) => HIGH_BASE,
                Some(RiskLevel::Medium) => MEDIUM_BASE,
                Some(RiskLevel::Low) => LOW_BASE,
                None => (1.0 - analysis.sentiment_score.clamp(0.0, 1.0)) * 80.0 + 10.0,
            };
            score += popularity_bonus(popularity, POPULARITY_CAP);
            if is_recent && score < RECENCY_CEILING {
                score += RECENCY_BONUS;
            }
            score
        };

        score.round().clamp(0.0, 100.0) as u8
    }
}

fn popularity_bonus(popularity: f64, cap: f64) -> f64 {
    (popularity / POPULARITY_DIVISOR).floor().min(cap)
}
