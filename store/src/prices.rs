//! Price snapshot and history stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxfeed_common::{HistoryEntry, PriceObservation, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::StoreResult;

/// Durable store for current prices and the append-only history log.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Latest snapshot for a pair, if one has ever been written.
    async fn snapshot(&self, symbol: &Symbol) -> StoreResult<Option<PriceObservation>>;

    /// Record an observation: upsert the snapshot row and append one
    /// history row, atomically. A reader never sees one without the other.
    async fn record_observation(&self, observation: &PriceObservation) -> StoreResult<()>;

    /// History entries for a pair with `observed_at >= cutoff`,
    /// ascending by time.
    async fn history_since(
        &self,
        symbol: &Symbol,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<HistoryEntry>>;
}

#[derive(Default)]
struct PriceStoreInner {
    snapshots: HashMap<Symbol, PriceObservation>,
    history: Vec<HistoryEntry>,
}

/// In-memory price store.
///
/// Snapshot upsert and history append happen under one lock, matching
/// the transactional guarantee of the Postgres implementation.
#[derive(Default)]
pub struct MemoryPriceStore {
    inner: Mutex<PriceStoreInner>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of history rows (test convenience).
    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn snapshot(&self, symbol: &Symbol) -> StoreResult<Option<PriceObservation>> {
        Ok(self.inner.lock().snapshots.get(symbol).cloned())
    }

    async fn record_observation(&self, observation: &PriceObservation) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner
            .snapshots
            .insert(observation.symbol.clone(), observation.clone());
        inner.history.push(HistoryEntry::from_observation(observation));
        Ok(())
    }

    async fn history_since(
        &self,
        symbol: &Symbol,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        let inner = self.inner.lock();
        let mut entries: Vec<HistoryEntry> = inner
            .history
            .iter()
            .filter(|e| &e.symbol == symbol && e.observed_at >= cutoff)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.observed_at);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn obs(s: &str, price: rust_decimal::Decimal, at: DateTime<Utc>) -> PriceObservation {
        PriceObservation::flat(sym(s), price, at, "test")
    }

    #[tokio::test]
    async fn record_updates_snapshot_and_appends_history() {
        let store = MemoryPriceStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap();

        store
            .record_observation(&obs("EURUSD", dec!(1.0850), t0))
            .await
            .unwrap();
        store
            .record_observation(&obs("EURUSD", dec!(1.0860), t0 + Duration::seconds(30)))
            .await
            .unwrap();

        let snapshot = store.snapshot(&sym("EURUSD")).await.unwrap().unwrap();
        assert_eq!(snapshot.price, dec!(1.0860));
        assert_eq!(store.history_len(), 2);
    }

    #[tokio::test]
    async fn history_since_filters_by_symbol_and_cutoff() {
        let store = MemoryPriceStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap();

        store
            .record_observation(&obs("EURUSD", dec!(1.0850), t0))
            .await
            .unwrap();
        store
            .record_observation(&obs("GBPUSD", dec!(1.2500), t0))
            .await
            .unwrap();
        store
            .record_observation(&obs("EURUSD", dec!(1.0860), t0 + Duration::minutes(10)))
            .await
            .unwrap();

        let entries = store
            .history_since(&sym("EURUSD"), t0 + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].price, dec!(1.0860));
    }

    #[tokio::test]
    async fn history_is_ascending() {
        let store = MemoryPriceStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap();
        for i in [3i64, 1, 2] {
            store
                .record_observation(&obs("EURUSD", dec!(1.08), t0 + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let entries = store.history_since(&sym("EURUSD"), t0).await.unwrap();
        let times: Vec<_> = entries.iter().map(|e| e.observed_at).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }
}
