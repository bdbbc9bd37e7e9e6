pub mod config;
pub mod error;
pub mod types;

pub use config::{AiProvider, AnalysisMode, Config, RedditConfig};
pub use error::BrandPulseError;
pub use types::*;
