//! Candle store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxfeed_common::{Candle, Symbol, Timeframe};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::StoreResult;

/// Durable OHLCV table keyed by (symbol, timeframe, bucket_start).
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Insert the candle or overwrite its OHLC values in place.
    async fn upsert(&self, candle: &Candle) -> StoreResult<()>;

    /// Candles for a pair and timeframe, oldest first.
    ///
    /// `until` bounds `bucket_start` from above; `limit` keeps the
    /// newest matching candles.
    async fn list(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
        until: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Candle>>;
}

type CandleKey = (Symbol, Timeframe, DateTime<Utc>);

/// In-memory candle store.
#[derive(Default)]
pub struct MemoryCandleStore {
    candles: RwLock<HashMap<CandleKey, Candle>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored candles (test convenience).
    pub fn len(&self) -> usize {
        self.candles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.read().is_empty()
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn upsert(&self, candle: &Candle) -> StoreResult<()> {
        let key = (
            candle.symbol.clone(),
            candle.timeframe,
            candle.bucket_start,
        );
        self.candles.write().insert(key, candle.clone());
        Ok(())
    }

    async fn list(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
        until: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Candle>> {
        let candles = self.candles.read();
        let mut matching: Vec<Candle> = candles
            .values()
            .filter(|c| {
                &c.symbol == symbol
                    && c.timeframe == timeframe
                    && until.map_or(true, |t| c.bucket_start <= t)
            })
            .cloned()
            .collect();
        // Newest first for the limit, then back to chronological order.
        matching.sort_by_key(|c| std::cmp::Reverse(c.bucket_start));
        matching.truncate(limit);
        matching.reverse();
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn candle(minute: u32, close: rust_decimal::Decimal) -> Candle {
        let start = Utc.with_ymd_and_hms(2025, 11, 3, 12, minute, 0).unwrap();
        let mut c = Candle::open_at(sym("EURUSD"), Timeframe::M5, start, dec!(1.0800));
        c.absorb(close);
        c
    }

    #[tokio::test]
    async fn upsert_overwrites_same_bucket() {
        let store = MemoryCandleStore::new();
        store.upsert(&candle(0, dec!(1.0810))).await.unwrap();
        store.upsert(&candle(0, dec!(1.0820))).await.unwrap();

        assert_eq!(store.len(), 1);
        let listed = store.list(&sym("EURUSD"), Timeframe::M5, 10, None).await.unwrap();
        assert_eq!(listed[0].close, dec!(1.0820));
    }

    #[tokio::test]
    async fn list_is_oldest_first_and_keeps_newest_within_limit() {
        let store = MemoryCandleStore::new();
        for minute in [0, 5, 10, 15] {
            store.upsert(&candle(minute, dec!(1.0810))).await.unwrap();
        }

        let listed = store.list(&sym("EURUSD"), Timeframe::M5, 2, None).await.unwrap();
        assert_eq!(listed.len(), 2);
        // The two newest buckets, in chronological order.
        assert_eq!(listed[0].bucket_start.format("%H:%M").to_string(), "12:10");
        assert_eq!(listed[1].bucket_start.format("%H:%M").to_string(), "12:15");
    }

    #[tokio::test]
    async fn list_honors_until_bound() {
        let store = MemoryCandleStore::new();
        for minute in [0, 5, 10] {
            store.upsert(&candle(minute, dec!(1.0810))).await.unwrap();
        }

        let until = Utc.with_ymd_and_hms(2025, 11, 3, 12, 5, 0).unwrap();
        let listed = store
            .list(&sym("EURUSD"), Timeframe::M5, 10, Some(until))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.bucket_start <= until));
    }

    #[tokio::test]
    async fn list_filters_by_timeframe() {
        let store = MemoryCandleStore::new();
        store.upsert(&candle(0, dec!(1.0810))).await.unwrap();

        let listed = store.list(&sym("EURUSD"), Timeframe::H1, 10, None).await.unwrap();
        assert!(listed.is_empty());
    }
}
