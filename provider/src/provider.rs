//! Rate provider trait.

use std::collections::HashMap;

use async_trait::async_trait;
use fxfeed_common::{PriceObservation, Symbol};

use crate::error::ProviderResult;

/// Trait for FX rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provider name (for logging and the observation `source` field).
    fn name(&self) -> &str;

    /// Fetch the latest price for a single symbol.
    async fn fetch_one(&self, symbol: &Symbol) -> ProviderResult<PriceObservation>;

    /// Fetch latest prices for a set of symbols.
    ///
    /// Per-symbol failure is expressed by the symbol being absent from
    /// the returned map, never by failing the whole call. `Err` means
    /// the provider was unreachable as a whole.
    async fn fetch_batch(
        &self,
        symbols: &[Symbol],
    ) -> ProviderResult<HashMap<Symbol, PriceObservation>>;
}
