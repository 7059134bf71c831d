//! Mock rate provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use fxfeed_common::{now, PriceObservation, Symbol};
use rust_decimal::Decimal;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::RateProvider;

/// In-memory rate provider with canned prices.
///
/// Counts upstream calls so tests can assert how often the read path
/// actually reached the provider.
pub struct MockRateProvider {
    name: String,
    prices: DashMap<Symbol, Decimal>,
    calls: AtomicUsize,
    fail_all: AtomicBool,
}

impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: DashMap::new(),
            calls: AtomicUsize::new(0),
            fail_all: AtomicBool::new(false),
        }
    }

    /// Set the price returned for a symbol.
    pub fn set_price(&self, symbol: Symbol, price: Decimal) {
        self.prices.insert(symbol, price);
    }

    /// Remove a symbol so subsequent fetches fail for it.
    pub fn clear_price(&self, symbol: &Symbol) {
        self.prices.remove(symbol);
    }

    /// Make every call return `Upstream` (total provider outage).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_all.store(unavailable, Ordering::SeqCst);
    }

    /// Number of fetch calls made so far (single and batch each count once).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> ProviderResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(ProviderError::Upstream("mock provider unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_one(&self, symbol: &Symbol) -> ProviderResult<PriceObservation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.prices
            .get(symbol)
            .map(|rate| PriceObservation::flat(symbol.clone(), *rate, now(), self.name.as_str()))
            .ok_or_else(|| ProviderError::QuoteNotFound {
                symbol: symbol.clone(),
            })
    }

    async fn fetch_batch(
        &self,
        symbols: &[Symbol],
    ) -> ProviderResult<HashMap<Symbol, PriceObservation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let observed_at = now();
        let mut results = HashMap::new();
        for symbol in symbols {
            if let Some(rate) = self.prices.get(symbol) {
                results.insert(
                    symbol.clone(),
                    PriceObservation::flat(symbol.clone(), *rate, observed_at, self.name.as_str()),
                );
            }
        }
        Ok(results)
    }
}
