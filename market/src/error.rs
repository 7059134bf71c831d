//! Market-layer error types.

use fxfeed_common::{InvalidSymbol, Symbol, UnsupportedTimeframe};
use fxfeed_provider::ProviderError;
use fxfeed_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the market services and jobs.
#[derive(Debug, Error)]
pub enum MarketError {
    /// The requested pair is not in the directory.
    #[error("Pair not found: {0}")]
    PairNotFound(Symbol),

    /// The pair exists but is not currently tradable.
    #[error("Pair is inactive: {0}")]
    PairInactive(Symbol),

    /// The raw symbol string could not be parsed.
    #[error(transparent)]
    InvalidSymbol(#[from] InvalidSymbol),

    /// The requested candle timeframe is not in the supported set.
    #[error(transparent)]
    UnsupportedTimeframe(#[from] UnsupportedTimeframe),

    /// A bulk request exceeded the per-call symbol cap.
    #[error("Too many symbols requested: {requested} (max {max})")]
    BulkLimitExceeded { requested: usize, max: usize },

    /// Upstream rate provider failure.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Durable store failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MarketError {
    /// Directory misses keep their identity across the store boundary.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PairNotFound(symbol) => MarketError::PairNotFound(symbol),
            other => MarketError::Store(other),
        }
    }
}

/// Result type for market operations.
pub type MarketResult<T> = Result<T, MarketError>;
