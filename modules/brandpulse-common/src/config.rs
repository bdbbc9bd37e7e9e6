use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

const DEFAULT_OPENAI_ANALYSIS_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_ASSIST_MODEL: &str = "gpt-4o";
const DEFAULT_CLAUDE_ANALYSIS_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_CLAUDE_ASSIST_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Which LLM provider backs analysis, reply drafting and brand verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Claude,
}

impl AiProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "claude" | "anthropic" => Ok(AiProvider::Claude),
            other => bail!("AI_PROVIDER must be 'openai' or 'claude', got '{other}'"),
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Claude => "ANTHROPIC_API_KEY",
        }
    }

    fn default_analysis_model(self) -> &'static str {
        match self {
            AiProvider::OpenAi => DEFAULT_OPENAI_ANALYSIS_MODEL,
            AiProvider::Claude => DEFAULT_CLAUDE_ANALYSIS_MODEL,
        }
    }

    fn default_assist_model(self) -> &'static str {
        match self {
            AiProvider::OpenAi => DEFAULT_OPENAI_ASSIST_MODEL,
            AiProvider::Claude => DEFAULT_CLAUDE_ASSIST_MODEL,
        }
    }
}

/// How the orchestrator dispatches per-mention analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// All mentions at once (optionally capped by `analysis_max_in_flight`).
    Parallel,
    /// One at a time with `analysis_delay` between dispatches, for quota-limited backends.
    Sequential,
}

impl AnalysisMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(AnalysisMode::Parallel),
            "sequential" => Ok(AnalysisMode::Sequential),
            other => bail!("ANALYSIS_MODE must be 'parallel' or 'sequential', got '{other}'"),
        }
    }
}

/// Script-app credentials. Present only when every REDDIT_* var is set.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // AI
    pub ai_provider: AiProvider,
    pub ai_api_key: String,
    pub analysis_model: String,
    pub assist_model: String,
    pub ai_timeout: Duration,

    // Analysis scheduling
    pub analysis_mode: AnalysisMode,
    pub analysis_delay: Duration,
    pub analysis_max_in_flight: Option<usize>,

    // Sources
    pub reddit: Option<RedditConfig>,
    pub apify_api_key: Option<String>,
    /// How long an X/Twitter actor run may poll before it is aborted.
    pub apify_run_timeout: Duration,
    pub source_result_limit: u32,
    pub source_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ai_provider = match get("AI_PROVIDER") {
            Some(v) => AiProvider::parse(&v)?,
            None => AiProvider::OpenAi,
        };
        let key_var = ai_provider.key_var();
        let ai_api_key = get(key_var)
            .ok_or_else(|| anyhow!("{key_var} environment variable is required"))?;

        let analysis_mode = match get("ANALYSIS_MODE") {
            Some(v) => AnalysisMode::parse(&v)?,
            None => AnalysisMode::Parallel,
        };

        let reddit = match (
            get("REDDIT_CLIENT_ID"),
            get("REDDIT_CLIENT_SECRET"),
            get("REDDIT_USERNAME"),
            get("REDDIT_PASSWORD"),
        ) {
            (Some(client_id), Some(client_secret), Some(username), Some(password)) => {
                Some(RedditConfig {
                    client_id,
                    client_secret,
                    username,
                    password,
                    user_agent: get("REDDIT_USER_AGENT")
                        .unwrap_or_else(|| format!("brandpulse/{}", env!("CARGO_PKG_VERSION"))),
                })
            }
            _ => None,
        };

        let analysis_max_in_flight = get("ANALYSIS_MAX_IN_FLIGHT")
            .map(|v| parse_var::<usize>("ANALYSIS_MAX_IN_FLIGHT", &v))
            .transpose()?
            .filter(|n| *n > 0);

        Ok(Self {
            web_host: get("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_or(&get, "WEB_PORT", 3000)?,
            ai_provider,
            ai_api_key,
            analysis_model: get("ANALYSIS_MODEL")
                .unwrap_or_else(|| ai_provider.default_analysis_model().to_string()),
            assist_model: get("ASSIST_MODEL")
                .unwrap_or_else(|| ai_provider.default_assist_model().to_string()),
            ai_timeout: Duration::from_secs(parse_or(&get, "AI_TIMEOUT_SECS", 30)?),
            analysis_mode,
            analysis_delay: Duration::from_millis(parse_or(&get, "ANALYSIS_DELAY_MS", 4500)?),
            analysis_max_in_flight,
            reddit,
            apify_api_key: get("APIFY_API_KEY"),
            apify_run_timeout: Duration::from_secs(parse_or(&get, "APIFY_RUN_TIMEOUT_SECS", 120)?),
            source_result_limit: parse_or(&get, "SOURCE_RESULT_LIMIT", 25)?,
            source_timeout: Duration::from_secs(parse_or(&get, "SOURCE_TIMEOUT_SECS", 30)?),
        })
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(4).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: Option<&str>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  WEB: {}:{}", self.web_host, self.web_port);
        tracing::info!(
            "  AI_PROVIDER: {:?} (analysis={}, assist={})",
            self.ai_provider,
            self.analysis_model,
            self.assist_model
        );
        tracing::info!("  {}: {}", self.ai_provider.key_var(), preview(&self.ai_api_key));
        tracing::info!(
            "  ANALYSIS_MODE: {:?} (delay={}ms, max_in_flight={:?})",
            self.analysis_mode,
            self.analysis_delay.as_millis(),
            self.analysis_max_in_flight
        );
        tracing::info!(
            "  REDDIT_CLIENT_ID: {}",
            preview_opt(self.reddit.as_ref().map(|r| r.client_id.as_str()))
        );
        tracing::info!(
            "  APIFY_API_KEY: {} (run timeout={}s)",
            preview_opt(self.apify_api_key.as_deref()),
            self.apify_run_timeout.as_secs()
        );
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got '{value}'"))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => parse_var(key, &v),
        None => Ok(default),
    }
}
