//! Latest-price read path.

use std::collections::HashMap;
use std::sync::Arc;

use fxfeed_common::{Pair, PriceObservation, Symbol};
use fxfeed_provider::{ProviderError, RateProvider};
use fxfeed_store::{PairDirectory, PriceStore};
use tracing::{debug, instrument, warn};

use crate::cache::SharedPriceCache;
use crate::error::{MarketError, MarketResult};

/// Result of a bulk price request: per-symbol best effort.
#[derive(Debug, Default)]
pub struct BulkPrices {
    /// Successfully resolved prices, keyed by normalized symbol.
    pub prices: HashMap<Symbol, PriceObservation>,
    /// Per-entry failures, keyed by the raw input string.
    pub errors: HashMap<String, MarketError>,
}

/// Cache-aside read path for latest prices.
///
/// Lookup order is cache, then snapshot store, then the upstream
/// provider; each lower layer writes back to the layers above it, so a
/// double miss costs exactly one upstream call.
pub struct PriceService {
    provider: Arc<dyn RateProvider>,
    directory: Arc<dyn PairDirectory>,
    prices: Arc<dyn PriceStore>,
    cache: SharedPriceCache,
    max_bulk_symbols: usize,
}

impl PriceService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        directory: Arc<dyn PairDirectory>,
        prices: Arc<dyn PriceStore>,
        cache: SharedPriceCache,
        max_bulk_symbols: usize,
    ) -> Self {
        Self {
            provider,
            directory,
            prices,
            cache,
            max_bulk_symbols,
        }
    }

    /// Latest price for one pair.
    #[instrument(skip(self))]
    pub async fn latest_price(&self, raw_symbol: &str) -> MarketResult<PriceObservation> {
        let symbol = self.resolve_active(raw_symbol).await?;

        if let Some(observation) = self.cache.get_price(&symbol) {
            return Ok(observation);
        }

        if let Some(observation) = self.prices.snapshot(&symbol).await? {
            debug!(symbol = %symbol, "Cache miss served from snapshot");
            self.cache.set_price(&observation);
            return Ok(observation);
        }

        debug!(symbol = %symbol, "Double miss, fetching from provider");
        let observation = self.provider.fetch_one(&symbol).await?;
        self.prices.record_observation(&observation).await?;
        self.cache.set_price(&observation);
        Ok(observation)
    }

    /// Latest prices for a set of raw symbols, best effort per entry.
    ///
    /// Symbols the cache or snapshot store already know are served
    /// locally; the remainder is fetched in one provider batch. A total
    /// provider failure fails only the symbols that needed it.
    pub async fn latest_prices_bulk(&self, raw_symbols: &[String]) -> MarketResult<BulkPrices> {
        if raw_symbols.len() > self.max_bulk_symbols {
            return Err(MarketError::BulkLimitExceeded {
                requested: raw_symbols.len(),
                max: self.max_bulk_symbols,
            });
        }

        let mut bulk = BulkPrices::default();
        let mut misses: Vec<(String, Symbol)> = Vec::new();

        for raw in raw_symbols {
            let symbol = match self.resolve_active(raw).await {
                Ok(symbol) => symbol,
                Err(e) => {
                    bulk.errors.insert(raw.clone(), e);
                    continue;
                }
            };
            if bulk.prices.contains_key(&symbol) {
                continue;
            }
            if let Some(observation) = self.cache.get_price(&symbol) {
                bulk.prices.insert(symbol, observation);
                continue;
            }
            match self.prices.snapshot(&symbol).await {
                Ok(Some(observation)) => {
                    self.cache.set_price(&observation);
                    bulk.prices.insert(symbol, observation);
                }
                // One batch slot per symbol, however often it was asked for.
                Ok(None) if misses.iter().any(|(_, s)| s == &symbol) => {}
                Ok(None) => misses.push((raw.clone(), symbol)),
                Err(e) => {
                    bulk.errors.insert(raw.clone(), e.into());
                }
            }
        }

        if misses.is_empty() {
            return Ok(bulk);
        }

        let miss_symbols: Vec<Symbol> = misses.iter().map(|(_, s)| s.clone()).collect();
        let mut fetched = match self.provider.fetch_batch(&miss_symbols).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "Bulk provider fetch failed");
                let message = e.to_string();
                for (raw, _) in misses {
                    bulk.errors.insert(
                        raw,
                        MarketError::Provider(ProviderError::Upstream(message.clone())),
                    );
                }
                return Ok(bulk);
            }
        };

        for (raw, symbol) in misses {
            match fetched.remove(&symbol) {
                Some(observation) => {
                    if let Err(e) = self.prices.record_observation(&observation).await {
                        bulk.errors.insert(raw, e.into());
                        continue;
                    }
                    self.cache.set_price(&observation);
                    bulk.prices.insert(symbol, observation);
                }
                None => {
                    bulk.errors.insert(
                        raw,
                        MarketError::Provider(ProviderError::QuoteNotFound { symbol }),
                    );
                }
            }
        }

        Ok(bulk)
    }

    /// Active pairs, read through the long-TTL cache.
    pub async fn active_pairs(&self) -> MarketResult<Vec<Pair>> {
        if let Some(pairs) = self.cache.get_active_pairs() {
            return Ok(pairs);
        }
        let pairs = self.directory.list_active().await?;
        self.cache.set_active_pairs(&pairs);
        Ok(pairs)
    }

    /// Normalize a raw symbol and check it is a known, active pair.
    async fn resolve_active(&self, raw: &str) -> MarketResult<Symbol> {
        let symbol = Symbol::parse(raw)?;
        let pair = self.directory.resolve(&symbol).await?;
        if !pair.active {
            return Err(MarketError::PairInactive(symbol));
        }
        Ok(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PriceCache;
    use fxfeed_common::now;
    use fxfeed_provider::MockRateProvider;
    use fxfeed_store::{MemoryPairDirectory, MemoryPriceStore};
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    struct Fixture {
        provider: Arc<MockRateProvider>,
        directory: Arc<MemoryPairDirectory>,
        prices: Arc<MemoryPriceStore>,
        cache: SharedPriceCache,
        service: PriceService,
    }

    fn fixture(active: &[&str]) -> Fixture {
        let provider = Arc::new(MockRateProvider::new("mock"));
        let directory = Arc::new(MemoryPairDirectory::with_active(
            active.iter().map(|s| sym(s)),
        ));
        let prices = Arc::new(MemoryPriceStore::new());
        let cache = Arc::new(PriceCache::new());
        let service = PriceService::new(
            provider.clone(),
            directory.clone(),
            prices.clone(),
            cache.clone(),
            100,
        );
        Fixture {
            provider,
            directory,
            prices,
            cache,
            service,
        }
    }

    #[tokio::test]
    async fn double_miss_costs_one_provider_call_and_fills_both_layers() {
        let fx = fixture(&["EURUSD"]);
        fx.provider.set_price(sym("EURUSD"), dec!(1.0850));

        let first = fx.service.latest_price("EURUSD").await.unwrap();
        assert_eq!(first.price, dec!(1.0850));
        assert_eq!(fx.provider.calls(), 1);

        // Store and cache now agree with the returned value.
        let snapshot = fx.prices.snapshot(&sym("EURUSD")).await.unwrap().unwrap();
        assert_eq!(snapshot, first);
        assert_eq!(fx.cache.get_price(&sym("EURUSD")).unwrap(), first);

        // Second read is a cache hit.
        let second = fx.service.latest_price("EURUSD").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(fx.provider.calls(), 1);
    }

    #[tokio::test]
    async fn snapshot_hit_skips_provider_and_writes_back_to_cache() {
        let fx = fixture(&["EURUSD"]);
        let stored = PriceObservation::flat(sym("EURUSD"), dec!(1.0900), now(), "seed");
        fx.prices.record_observation(&stored).await.unwrap();

        let got = fx.service.latest_price("eur/usd").await.unwrap();
        assert_eq!(got, stored);
        assert_eq!(fx.provider.calls(), 0);
        assert!(fx.cache.get_price(&sym("EURUSD")).is_some());
    }

    #[tokio::test]
    async fn unknown_and_inactive_pairs_are_rejected() {
        let fx = fixture(&["EURUSD"]);
        fx.directory.set_active(&sym("EURUSD"), false).await.unwrap();

        let err = fx.service.latest_price("GBPUSD").await.unwrap_err();
        assert!(matches!(err, MarketError::PairNotFound(_)));

        let err = fx.service.latest_price("EURUSD").await.unwrap_err();
        assert!(matches!(err, MarketError::PairInactive(_)));

        let err = fx.service.latest_price("not a pair").await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn provider_miss_propagates_and_leaves_no_state() {
        let fx = fixture(&["EURUSD"]);

        let err = fx.service.latest_price("EURUSD").await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::Provider(ProviderError::QuoteNotFound { .. })
        ));
        assert!(fx.prices.snapshot(&sym("EURUSD")).await.unwrap().is_none());
        assert!(fx.cache.get_price(&sym("EURUSD")).is_none());
    }

    #[tokio::test]
    async fn bulk_is_best_effort_per_entry() {
        let fx = fixture(&["EURUSD", "GBPUSD"]);
        fx.provider.set_price(sym("EURUSD"), dec!(1.0850));

        let bulk = fx
            .service
            .latest_prices_bulk(&[
                "EURUSD".to_string(),
                "GBPUSD".to_string(),
                "bogus".to_string(),
                "USDJPY".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(bulk.prices.len(), 1);
        assert_eq!(bulk.prices[&sym("EURUSD")].price, dec!(1.0850));
        // GBPUSD had no quote, "bogus" failed to parse, USDJPY is unknown.
        assert!(matches!(
            bulk.errors["GBPUSD"],
            MarketError::Provider(ProviderError::QuoteNotFound { .. })
        ));
        assert!(matches!(bulk.errors["bogus"], MarketError::InvalidSymbol(_)));
        assert!(matches!(bulk.errors["USDJPY"], MarketError::PairNotFound(_)));
    }

    #[tokio::test]
    async fn bulk_total_provider_failure_fails_only_fetched_symbols() {
        let fx = fixture(&["EURUSD", "GBPUSD"]);
        let stored = PriceObservation::flat(sym("EURUSD"), dec!(1.0900), now(), "seed");
        fx.prices.record_observation(&stored).await.unwrap();
        fx.provider.set_unavailable(true);

        let bulk = fx
            .service
            .latest_prices_bulk(&["EURUSD".to_string(), "GBPUSD".to_string()])
            .await
            .unwrap();

        assert_eq!(bulk.prices.len(), 1);
        assert!(bulk.prices.contains_key(&sym("EURUSD")));
        assert!(matches!(
            bulk.errors["GBPUSD"],
            MarketError::Provider(ProviderError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn bulk_duplicate_symbols_resolve_once_without_errors() {
        let fx = fixture(&["EURUSD"]);
        fx.provider.set_price(sym("EURUSD"), dec!(1.0850));

        let bulk = fx
            .service
            .latest_prices_bulk(&[
                "EURUSD".to_string(),
                "EURUSD".to_string(),
                "eur/usd".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(bulk.prices.len(), 1);
        assert_eq!(bulk.prices[&sym("EURUSD")].price, dec!(1.0850));
        assert!(bulk.errors.is_empty());
        assert_eq!(fx.provider.calls(), 1);
    }

    #[tokio::test]
    async fn bulk_enforces_symbol_cap() {
        let fx = fixture(&["EURUSD"]);
        let raws: Vec<String> = (0..101).map(|_| "EURUSD".to_string()).collect();

        let err = fx.service.latest_prices_bulk(&raws).await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::BulkLimitExceeded { requested: 101, max: 100 }
        ));
    }

    #[tokio::test]
    async fn active_pairs_read_through_cache() {
        let fx = fixture(&["EURUSD", "GBPUSD"]);

        let pairs = fx.service.active_pairs().await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(fx.cache.get_active_pairs().is_some());

        // A directory change is not visible until the entry expires.
        fx.directory.set_active(&sym("GBPUSD"), false).await.unwrap();
        let cached = fx.service.active_pairs().await.unwrap();
        assert_eq!(cached.len(), 2);
    }
}
