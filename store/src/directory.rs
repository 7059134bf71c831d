//! Pair directory: source of truth for which symbols exist and are tradable.

use async_trait::async_trait;
use dashmap::DashMap;
use fxfeed_common::{Pair, Symbol};

use crate::error::{StoreError, StoreResult};

/// Directory of known forex pairs.
///
/// Pairs are created by seeding, toggled by activation, and never
/// deleted while snapshots, history or candles reference them.
#[async_trait]
pub trait PairDirectory: Send + Sync {
    /// List all active pairs, ordered by symbol.
    async fn list_active(&self) -> StoreResult<Vec<Pair>>;

    /// Look up a pair (active or not). `PairNotFound` if unknown.
    async fn resolve(&self, symbol: &Symbol) -> StoreResult<Pair>;

    /// Seed a new pair. `Conflict` if the symbol already exists.
    async fn insert(&self, pair: Pair) -> StoreResult<()>;

    /// Toggle a pair's activation flag. `PairNotFound` if unknown.
    async fn set_active(&self, symbol: &Symbol, active: bool) -> StoreResult<()>;
}

/// In-memory pair directory.
#[derive(Default)]
pub struct MemoryPairDirectory {
    pairs: DashMap<Symbol, Pair>,
}

impl MemoryPairDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory from active symbols (test convenience).
    pub fn with_active(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let directory = Self::new();
        for symbol in symbols {
            directory.pairs.insert(symbol.clone(), Pair::new(symbol));
        }
        directory
    }
}

#[async_trait]
impl PairDirectory for MemoryPairDirectory {
    async fn list_active(&self) -> StoreResult<Vec<Pair>> {
        let mut pairs: Vec<Pair> = self
            .pairs
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.clone())
            .collect();
        pairs.sort_by_key(|p| p.symbol.as_str());
        Ok(pairs)
    }

    async fn resolve(&self, symbol: &Symbol) -> StoreResult<Pair> {
        self.pairs
            .get(symbol)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::PairNotFound(symbol.clone()))
    }

    async fn insert(&self, pair: Pair) -> StoreResult<()> {
        if self.pairs.contains_key(&pair.symbol) {
            return Err(StoreError::Conflict(format!(
                "pair {} already exists",
                pair.symbol
            )));
        }
        self.pairs.insert(pair.symbol.clone(), pair);
        Ok(())
    }

    async fn set_active(&self, symbol: &Symbol, active: bool) -> StoreResult<()> {
        match self.pairs.get_mut(symbol) {
            Some(mut entry) => {
                entry.active = active;
                Ok(())
            }
            None => Err(StoreError::PairNotFound(symbol.clone())),
        }
    }
}
