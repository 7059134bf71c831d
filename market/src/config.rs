//! Market configuration.

use std::time::Duration;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for latest-price entries.
    pub price_ttl: Duration,
    /// TTL for the active-pair listing.
    pub pairs_ttl: Duration,
    /// Maximum number of cache entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            price_ttl: Duration::from_secs(30),
            pairs_ttl: Duration::from_secs(3600),
            max_entries: 10000,
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Polling period for latest prices.
    pub poll_interval: Duration,
    /// Maximum attempts per job run.
    pub max_retries: usize,
    /// Retry backoff base (doubled per attempt).
    pub retry_backoff_base: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
        }
    }
}

/// Main market configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Database URL.
    pub database_url: String,
    /// ForexRateAPI key.
    pub api_key: String,
    /// Upstream request timeout.
    pub request_timeout: Duration,
    /// Maximum symbols per bulk price request.
    pub max_bulk_symbols: usize,
    /// Maximum candles per listing request.
    pub max_candle_limit: usize,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Job configuration.
    pub jobs: JobConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/fxfeed".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
            max_bulk_symbols: 100,
            max_candle_limit: 1000,
            cache: CacheConfig::default(),
            jobs: JobConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl MarketConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(key) = std::env::var("FOREX_RATE_API_KEY") {
            config.api_key = key;
        }

        if let Ok(secs) = std::env::var("FXFEED_POLL_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.jobs.poll_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("FXFEED_PRICE_TTL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.cache.price_ttl = Duration::from_secs(secs);
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }

        if self.jobs.poll_interval.is_zero() {
            return Err("Poll interval cannot be zero".to_string());
        }

        if self.max_bulk_symbols == 0 {
            return Err("Bulk symbol cap cannot be zero".to_string());
        }

        if self.cache.price_ttl > self.cache.pairs_ttl {
            return Err("Price TTL cannot exceed pairs TTL".to_string());
        }

        Ok(())
    }
}
