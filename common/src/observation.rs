//! Price observation types exchanged between providers, caches and stores.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::symbol::Symbol;

/// A single normalized price observation for a forex pair.
///
/// This is the canonical shape produced by rate providers and carried
/// across the cache and store boundaries. Prices are arbitrary-precision
/// decimals; bid and ask fall back to the mid price when the upstream
/// source exposes no spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// The pair this observation belongs to.
    pub symbol: Symbol,
    /// Mid price.
    pub price: Decimal,
    /// Bid price.
    pub bid: Decimal,
    /// Ask price.
    pub ask: Decimal,
    /// When the price was observed (UTC).
    pub observed_at: DateTime<Utc>,
    /// Provider identifier.
    pub source: String,
}

impl PriceObservation {
    /// Create an observation without a spread: bid = ask = price.
    pub fn flat(symbol: Symbol, price: Decimal, observed_at: DateTime<Utc>, source: impl Into<String>) -> Self {
        Self {
            symbol,
            price,
            bid: price,
            ask: price,
            observed_at,
            source: source.into(),
        }
    }
}

/// An append-only historical copy of a price observation.
///
/// History rows are created by the polling job, never updated, and are
/// the sole input to candle aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row identity.
    pub id: Uuid,
    /// The pair this entry belongs to.
    pub symbol: Symbol,
    /// Mid price at observation time.
    pub price: Decimal,
    /// Bid price.
    pub bid: Decimal,
    /// Ask price.
    pub ask: Decimal,
    /// When the price was observed (UTC).
    pub observed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create a history entry from an observation, assigning a fresh id.
    pub fn from_observation(obs: &PriceObservation) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: obs.symbol.clone(),
            price: obs.price,
            bid: obs.bid,
            ask: obs.ask,
            observed_at: obs.observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_observation_has_no_spread() {
        let obs = PriceObservation::flat(
            Symbol::parse("EURUSD").unwrap(),
            dec!(1.0850),
            Utc::now(),
            "test",
        );
        assert_eq!(obs.bid, obs.price);
        assert_eq!(obs.ask, obs.price);
    }

    #[test]
    fn history_entry_copies_observation_fields() {
        let obs = PriceObservation::flat(
            Symbol::parse("GBPUSD").unwrap(),
            dec!(1.2500),
            Utc::now(),
            "test",
        );
        let entry = HistoryEntry::from_observation(&obs);
        assert_eq!(entry.symbol, obs.symbol);
        assert_eq!(entry.price, obs.price);
        assert_eq!(entry.observed_at, obs.observed_at);
    }
}
