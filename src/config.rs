//! Environment-driven configuration

use crate::TravelError;
use chrono::Duration;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_RAPIDAPI_HOST: &str = "booking-com15.p.rapidapi.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Weights and caps for hotel ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub rating_weight: f64,
    pub preference_weight: f64,
    /// Number of hotels kept after ranking
    pub top_n: usize,
    /// Most hotels sent to the language model in one prompt
    pub max_candidates: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            rating_weight: 0.7,
            preference_weight: 0.3,
            top_n: 3,
            max_candidates: 20,
        }
    }
}

/// Language model connection settings
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Process-wide settings, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub rapidapi_key: String,
    pub rapidapi_host: String,
    pub openai: Option<OpenAiConfig>,
    pub cache_path: PathBuf,
    pub cache_ttl_hours: i64,
    pub ranking: RankingConfig,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, TravelError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TravelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rapidapi_key = get("RAPIDAPI_KEY")
            .ok_or_else(|| TravelError::MissingCredential("RAPIDAPI_KEY".to_string()))?;

        let openai = match get("OPENAI_API_KEY") {
            Some(api_key) => Some(OpenAiConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                timeout_secs: parse_or(get("OPENAI_TIMEOUT_SECS"), "OPENAI_TIMEOUT_SECS", 30)?,
            }),
            None => None,
        };

        let defaults = RankingConfig::default();
        let ranking = RankingConfig {
            rating_weight: parse_or(
                get("TRAVEL_RATING_WEIGHT"),
                "TRAVEL_RATING_WEIGHT",
                defaults.rating_weight,
            )?,
            preference_weight: parse_or(
                get("TRAVEL_PREFERENCE_WEIGHT"),
                "TRAVEL_PREFERENCE_WEIGHT",
                defaults.preference_weight,
            )?,
            top_n: parse_or(get("TRAVEL_TOP_N"), "TRAVEL_TOP_N", defaults.top_n)?,
            max_candidates: parse_or(
                get("TRAVEL_MAX_CANDIDATES"),
                "TRAVEL_MAX_CANDIDATES",
                defaults.max_candidates,
            )?,
        };

        if ranking.top_n == 0 {
            return Err(TravelError::ConfigError("TRAVEL_TOP_N must be at least 1".to_string()));
        }

        let cache_ttl_hours =
            parse_or(get("TRAVEL_CACHE_TTL_HOURS"), "TRAVEL_CACHE_TTL_HOURS", 24)?;
        if cache_ttl_hours <= 0 {
            return Err(TravelError::ConfigError(
                "TRAVEL_CACHE_TTL_HOURS must be positive".to_string(),
            ));
        }
        cache_ttl(cache_ttl_hours)?;

        Ok(Self {
            rapidapi_key,
            rapidapi_host: get("RAPIDAPI_HOST")
                .unwrap_or_else(|| DEFAULT_RAPIDAPI_HOST.to_string()),
            openai,
            cache_path: PathBuf::from(
                get("TRAVEL_CACHE_PATH").unwrap_or_else(|| "travel-cache".to_string()),
            ),
            cache_ttl_hours,
            ranking,
        })
    }
}

/// Cache lifetime for a TTL given in hours
pub fn cache_ttl(hours: i64) -> Result<Duration, TravelError> {
    Duration::try_hours(hours).ok_or_else(|| {
        TravelError::ConfigError(format!("TRAVEL_CACHE_TTL_HOURS {} is out of range", hours))
    })
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, TravelError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TravelError::ConfigError(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}
