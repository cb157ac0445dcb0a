use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client;
use crate::ranking::store::{DEFAULT_QUALIFIED_THRESHOLD, DEFAULT_TOP_N};
use crate::scoring::batch::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use crate::scout::pipeline::DEFAULT_MAX_CANDIDATES_PER_SEARCH;
use crate::sourcing::filter::FilterPolicy;

pub const DEFAULT_TWITTER_BASE_URL: &str = "https://api.twitter.com/2";
pub const DEFAULT_OAUTH_CALLBACK_URL: &str = "http://localhost:8000/auth/twitter/callback";
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub xai_api_key: String,
    pub xai_base_url: String,
    pub xai_model: String,
    /// Absent → profile search is unavailable and every search returns empty.
    pub twitter_bearer_token: Option<String>,
    pub twitter_base_url: String,
    pub twitter_client_id: Option<String>,
    pub twitter_oauth_callback_url: String,
    pub scout: ScoutConfig,
}

/// Tunables for the search pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoutConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub top_n: usize,
    pub max_candidates: usize,
    pub qualified_threshold: u8,
    pub search_timeout: Duration,
    pub filter: FilterPolicy,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            top_n: DEFAULT_TOP_N,
            max_candidates: DEFAULT_MAX_CANDIDATES_PER_SEARCH,
            qualified_threshold: DEFAULT_QUALIFIED_THRESHOLD,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            filter: FilterPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);
        let defaults = ScoutConfig::default();

        let mut filter = FilterPolicy {
            min_followers: env.parse_or("SCOUT_MIN_FOLLOWERS", defaults.filter.min_followers)?,
            min_bio_chars: env.parse_or("SCOUT_MIN_BIO_CHARS", defaults.filter.min_bio_chars)?,
            ..defaults.filter.clone()
        };
        if let Some(list) = env.list("SCOUT_TECH_KEYWORDS") {
            filter.tech_keywords = list;
        }
        if let Some(list) = env.list("SCOUT_ROLE_INDICATORS") {
            filter.role_indicators = list;
        }

        let scout = ScoutConfig {
            batch_size: env.parse_or("SCOUT_BATCH_SIZE", defaults.batch_size)?,
            batch_delay: Duration::from_millis(
                env.parse_or("SCOUT_BATCH_DELAY_MS", defaults.batch_delay.as_millis() as u64)?,
            ),
            top_n: env.parse_or("SCOUT_TOP_N", defaults.top_n)?,
            max_candidates: env.parse_or("SCOUT_MAX_CANDIDATES", defaults.max_candidates)?,
            qualified_threshold: env
                .parse_or("SCOUT_QUALIFIED_THRESHOLD", defaults.qualified_threshold)?
                .min(100),
            search_timeout: Duration::from_secs(
                env.parse_or("SCOUT_SEARCH_TIMEOUT_SECS", defaults.search_timeout.as_secs())?,
            ),
            filter,
        };

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            port: env.parse_or("PORT", 8000u16)?,
            rust_log: env.or("RUST_LOG", "info"),
            xai_api_key: env.require("XAI_API_KEY")?,
            xai_base_url: env.or("XAI_BASE_URL", llm_client::DEFAULT_BASE_URL),
            xai_model: env.or("XAI_MODEL", llm_client::DEFAULT_MODEL),
            twitter_bearer_token: env.optional("TWITTER_BEARER_TOKEN"),
            twitter_base_url: env.or("TWITTER_BASE_URL", DEFAULT_TWITTER_BASE_URL),
            twitter_client_id: env.optional("TWITTER_CLIENT_ID"),
            twitter_oauth_callback_url: env.or("TWITTER_OAUTH_CALLBACK_URL", DEFAULT_OAUTH_CALLBACK_URL),
            scout,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
            None => Ok(default),
        }
    }

    /// Comma-separated, lowercased, blanks dropped. `None` when unset or empty.
    fn list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .optional(key)?
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect();
        (!items.is_empty()).then_some(items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/talentscout"),
        ("XAI_API_KEY", "xai-test"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.xai_model, "grok-3");
        assert_eq!(config.twitter_base_url, DEFAULT_TWITTER_BASE_URL);
        assert_eq!(config.twitter_bearer_token, None);
        assert_eq!(config.scout, ScoutConfig::default());
        assert_eq!(config.scout.batch_size, 5);
        assert_eq!(config.scout.batch_delay, Duration::from_millis(500));
        assert_eq!(config.scout.search_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_required_fails() {
        let err = load(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(err.to_string().contains("XAI_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SCOUT_BATCH_SIZE", "3"),
            ("SCOUT_TOP_N", "25"),
            ("SCOUT_MIN_FOLLOWERS", "1000"),
            ("SCOUT_TECH_KEYWORDS", " Rust, Zig ,, "),
            ("TWITTER_BEARER_TOKEN", "token"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.scout.batch_size, 3);
        assert_eq!(config.scout.top_n, 25);
        assert_eq!(config.scout.filter.min_followers, 1000);
        assert_eq!(config.scout.filter.tech_keywords, vec!["rust", "zig"]);
        assert_eq!(config.twitter_bearer_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_malformed_number_fails_with_key() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCOUT_BATCH_SIZE", "five"));
        let err = load(&pairs).unwrap_err();
        assert!(err.to_string().contains("SCOUT_BATCH_SIZE"));
    }

    #[test]
    fn test_threshold_is_capped_at_100() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCOUT_QUALIFIED_THRESHOLD", "200"));
        assert_eq!(load(&pairs).unwrap().scout.qualified_threshold, 100);
    }
}
