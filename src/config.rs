// Environment-driven configuration, loaded once at startup

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Retry policy for transient upstream failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Full application configuration. Values come from the environment (with an
/// optional `.env` file); only the API key is mandatory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    /// Max outbound calls per rolling window, shared across the process.
    pub rate_limit_calls: u32,
    pub rate_limit_window: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub http_timeout: Duration,
    /// Fallback when an apartment does not declare its own minimum stay.
    pub default_min_stay_nights: i64,
    /// Gaps starting sooner than this are too late to market.
    pub min_advance_notice_days: i64,
    /// How far ahead of today the scan window reaches.
    pub scan_horizon_days: i64,
    /// Upper bound on apartments fetched concurrently.
    pub fetch_concurrency: usize,
    pub campaign_template: String,
    pub retry: RetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://login.smoobu.com/api".to_string(),
            api_key: String::new(),
            rate_limit_calls: 60,
            rate_limit_window: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 100,
            http_timeout: Duration::from_secs(30),
            default_min_stay_nights: 2,
            min_advance_notice_days: 3,
            scan_horizon_days: 90,
            fetch_concurrency: 4,
            campaign_template: "gap_offer".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment. `dotenvy` is expected to have
    /// been invoked by the caller so a local `.env` is already merged in.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config = Self {
            api_base_url: env_or("BOOKING_API_BASE_URL", defaults.api_base_url),
            api_key: env::var("BOOKING_API_KEY")
                .map_err(|_| ConfigError("BOOKING_API_KEY is not set".to_string()))?,
            rate_limit_calls: parse_env("RATE_LIMIT_CALLS", defaults.rate_limit_calls)?,
            rate_limit_window: Duration::from_secs(parse_env(
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(parse_env(
                "CACHE_TTL_SECONDS",
                defaults.cache_ttl.as_secs(),
            )?),
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            http_timeout: Duration::from_secs(parse_env(
                "HTTP_TIMEOUT_SECONDS",
                defaults.http_timeout.as_secs(),
            )?),
            default_min_stay_nights: parse_env(
                "DEFAULT_MIN_STAY_NIGHTS",
                defaults.default_min_stay_nights,
            )?,
            min_advance_notice_days: parse_env(
                "MIN_ADVANCE_NOTICE_DAYS",
                defaults.min_advance_notice_days,
            )?,
            scan_horizon_days: parse_env("SCAN_HORIZON_DAYS", defaults.scan_horizon_days)?,
            fetch_concurrency: parse_env("FETCH_CONCURRENCY", defaults.fetch_concurrency)?,
            campaign_template: env_or("CAMPAIGN_TEMPLATE", defaults.campaign_template),
            retry: RetryConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError("BOOKING_API_KEY is empty".to_string()));
        }
        if self.rate_limit_calls == 0 {
            return Err(ConfigError("RATE_LIMIT_CALLS must be > 0".to_string()));
        }
        if self.rate_limit_window.is_zero() {
            return Err(ConfigError(
                "RATE_LIMIT_WINDOW_SECONDS must be > 0".to_string(),
            ));
        }
        if self.scan_horizon_days <= 0 {
            return Err(ConfigError("SCAN_HORIZON_DAYS must be > 0".to_string()));
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError("FETCH_CONCURRENCY must be > 0".to_string()));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
