pub mod aggregator;
pub mod analyzer;
pub mod assist;
pub mod orchestrator;
pub mod parse;
pub mod scorer;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod verify;

pub use aggregator::Aggregator;
pub use analyzer::{LlmAnalyzer, TextAnalyzer};
pub use assist::ReplyAssistant;
pub use orchestrator::{AnalysisStrategy, Pipeline, RankedMentions};
pub use scorer::RiskScorer;
pub use sources::{MentionSource, RedditSource, TwitterSource};
pub use verify::BrandVerifier;
