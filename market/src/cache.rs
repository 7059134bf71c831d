//! Price caching with TTL support.
//!
//! Entries are stored as JSON blobs under namespaced keys
//! (`price:<symbol>`, `pairs:active`), so a corrupt or stale payload
//! degrades to a cache miss rather than an error.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fxfeed_common::{Pair, PriceObservation, Symbol};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const PAIRS_KEY: &str = "pairs:active";

/// Cached JSON payload.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    cached_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(payload: String, ttl: Duration) -> Self {
        Self {
            payload,
            cached_at: Utc::now(),
            ttl,
        }
    }

    fn is_valid(&self) -> bool {
        Utc::now().signed_duration_since(self.cached_at) < self.ttl
    }
}

/// Configuration for the price cache.
#[derive(Debug, Clone)]
pub struct PriceCacheConfig {
    /// TTL for `price:<symbol>` entries.
    pub price_ttl: Duration,
    /// TTL for the `pairs:active` entry.
    pub pairs_ttl: Duration,
    /// Maximum number of entries.
    pub max_entries: usize,
}

impl Default for PriceCacheConfig {
    fn default() -> Self {
        Self {
            price_ttl: Duration::seconds(30),
            pairs_ttl: Duration::hours(1),
            max_entries: 10000,
        }
    }
}

/// Thread-safe price cache with per-namespace TTLs.
///
/// Failures never propagate: a set that cannot serialize is logged and
/// dropped, and a get that cannot decode is treated as a miss.
pub struct PriceCache {
    cache: DashMap<String, CacheEntry>,
    config: PriceCacheConfig,
}

impl PriceCache {
    /// Create a cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(PriceCacheConfig::default())
    }

    /// Create a cache with custom configuration.
    pub fn with_config(config: PriceCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Get the cached latest price for a symbol, if still valid.
    pub fn get_price(&self, symbol: &Symbol) -> Option<PriceObservation> {
        self.get_json(&Self::price_key(symbol))
    }

    /// Cache the latest price for a symbol.
    pub fn set_price(&self, observation: &PriceObservation) {
        self.set_json(
            Self::price_key(&observation.symbol),
            observation,
            self.config.price_ttl,
        );
    }

    /// Get the cached active-pair listing, if still valid.
    pub fn get_active_pairs(&self) -> Option<Vec<Pair>> {
        self.get_json(PAIRS_KEY)
    }

    /// Cache the active-pair listing.
    pub fn set_active_pairs(&self, pairs: &[Pair]) {
        self.set_json(PAIRS_KEY.to_string(), &pairs, self.config.pairs_ttl);
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.cache.retain(|_, entry| entry.is_valid());
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.cache.get(key)?;
        if !entry.is_valid() {
            debug!(key, "Cache entry expired");
            drop(entry);
            self.cache.remove(key);
            return None;
        }
        match serde_json::from_str(&entry.payload) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                drop(entry);
                self.cache.remove(key);
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        // Check capacity; overwriting an existing key cannot grow the map.
        if self.cache.len() >= self.config.max_entries && !self.cache.contains_key(&key) {
            self.evict_expired();
            if self.cache.len() >= self.config.max_entries {
                debug!(key, "Cache full, dropping insert");
                return;
            }
        }

        self.cache.insert(key, CacheEntry::new(payload, ttl));
    }

    fn price_key(symbol: &Symbol) -> String {
        format!("price:{symbol}")
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared price cache.
pub type SharedPriceCache = Arc<PriceCache>;
