//! Postgres-backed implementation of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxfeed_common::{Candle, HistoryEntry, Pair, PriceObservation, Symbol, Timeframe};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::candles::CandleStore;
use crate::directory::PairDirectory;
use crate::error::{StoreError, StoreResult};
use crate::prices::PriceStore;

/// Postgres market store implementing [`PairDirectory`], [`PriceStore`]
/// and [`CandleStore`] over one connection pool.
#[derive(Clone)]
pub struct PgMarketStore {
    pool: PgPool,
}

impl PgMarketStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))
    }

    fn pair_from_row(row: &PgRow) -> StoreResult<Pair> {
        let symbol: String = row.try_get("symbol")?;
        let active: bool = row.try_get("is_active")?;
        let symbol = Symbol::parse(&symbol).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Pair::with_active(symbol, active))
    }

    fn observation_from_row(row: &PgRow) -> StoreResult<PriceObservation> {
        let symbol: String = row.try_get("symbol")?;
        let symbol = Symbol::parse(&symbol).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(PriceObservation {
            symbol,
            price: row.try_get("price")?,
            bid: row.try_get("bid")?,
            ask: row.try_get("ask")?,
            observed_at: row.try_get("observed_at")?,
            source: row.try_get("source")?,
        })
    }

    fn history_from_row(row: &PgRow) -> StoreResult<HistoryEntry> {
        let symbol: String = row.try_get("symbol")?;
        let symbol = Symbol::parse(&symbol).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(HistoryEntry {
            id: row.try_get("id")?,
            symbol,
            price: row.try_get("price")?,
            bid: row.try_get("bid")?,
            ask: row.try_get("ask")?,
            observed_at: row.try_get("observed_at")?,
        })
    }

    fn candle_from_row(row: &PgRow) -> StoreResult<Candle> {
        let symbol: String = row.try_get("symbol")?;
        let symbol = Symbol::parse(&symbol).map_err(|e| StoreError::Decode(e.to_string()))?;
        let timeframe: String = row.try_get("timeframe")?;
        let timeframe: Timeframe = timeframe
            .parse()
            .map_err(|e: fxfeed_common::UnsupportedTimeframe| StoreError::Decode(e.to_string()))?;
        Ok(Candle {
            symbol,
            timeframe,
            bucket_start: row.try_get("bucket_start")?,
            open: row.try_get("open")?,
            high: row.try_get("high")?,
            low: row.try_get("low")?,
            close: row.try_get("close")?,
            volume: row.try_get("volume")?,
        })
    }
}

#[async_trait]
impl PairDirectory for PgMarketStore {
    async fn list_active(&self) -> StoreResult<Vec<Pair>> {
        let rows = sqlx::query(
            "SELECT symbol, is_active FROM forex_pair WHERE is_active ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::pair_from_row).collect()
    }

    async fn resolve(&self, symbol: &Symbol) -> StoreResult<Pair> {
        let row = sqlx::query("SELECT symbol, is_active FROM forex_pair WHERE symbol = $1")
            .bind(symbol.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Self::pair_from_row(&row),
            None => Err(StoreError::PairNotFound(symbol.clone())),
        }
    }

    #[instrument(skip(self), fields(symbol = %pair.symbol))]
    async fn insert(&self, pair: Pair) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO forex_pair (symbol, base_currency, quote_currency, is_active)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(pair.symbol.as_str())
        .bind(pair.symbol.base().code())
        .bind(pair.symbol.quote().code())
        .bind(pair.active)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                StoreError::Conflict(format!("pair {} already exists", pair.symbol)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_active(&self, symbol: &Symbol, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE forex_pair SET is_active = $2 WHERE symbol = $1")
            .bind(symbol.as_str())
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::PairNotFound(symbol.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for PgMarketStore {
    async fn snapshot(&self, symbol: &Symbol) -> StoreResult<Option<PriceObservation>> {
        let row = sqlx::query(
            "SELECT symbol, price, bid, ask, observed_at, source
             FROM forex_price_snapshot WHERE symbol = $1",
        )
        .bind(symbol.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::observation_from_row).transpose()
    }

    #[instrument(skip(self, observation), fields(symbol = %observation.symbol))]
    async fn record_observation(&self, observation: &PriceObservation) -> StoreResult<()> {
        // Snapshot upsert and history append share one transaction so a
        // reader never observes one without the other.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO forex_price_snapshot (symbol, price, bid, ask, observed_at, source)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (symbol) DO UPDATE SET
                 price = EXCLUDED.price,
                 bid = EXCLUDED.bid,
                 ask = EXCLUDED.ask,
                 observed_at = EXCLUDED.observed_at,
                 source = EXCLUDED.source",
        )
        .bind(observation.symbol.as_str())
        .bind(observation.price)
        .bind(observation.bid)
        .bind(observation.ask)
        .bind(observation.observed_at)
        .bind(&observation.source)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO forex_price_history (id, symbol, price, bid, ask, observed_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(observation.symbol.as_str())
        .bind(observation.price)
        .bind(observation.bid)
        .bind(observation.ask)
        .bind(observation.observed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn history_since(
        &self,
        symbol: &Symbol,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, symbol, price, bid, ask, observed_at
             FROM forex_price_history
             WHERE symbol = $1 AND observed_at >= $2
             ORDER BY observed_at ASC",
        )
        .bind(symbol.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::history_from_row).collect()
    }
}

#[async_trait]
impl CandleStore for PgMarketStore {
    async fn upsert(&self, candle: &Candle) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO forex_candle (symbol, timeframe, bucket_start, open, high, low, close, volume)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (symbol, timeframe, bucket_start) DO UPDATE SET
                 open = EXCLUDED.open,
                 high = EXCLUDED.high,
                 low = EXCLUDED.low,
                 close = EXCLUDED.close",
        )
        .bind(candle.symbol.as_str())
        .bind(candle.timeframe.as_str())
        .bind(candle.bucket_start)
        .bind(candle.open)
        .bind(candle.high)
        .bind(candle.low)
        .bind(candle.close)
        .bind(candle.volume)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
        until: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Candle>> {
        let rows = sqlx::query(
            "SELECT symbol, timeframe, bucket_start, open, high, low, close, volume
             FROM forex_candle
             WHERE symbol = $1 AND timeframe = $2
               AND ($3::timestamptz IS NULL OR bucket_start <= $3)
             ORDER BY bucket_start DESC
             LIMIT $4",
        )
        .bind(symbol.as_str())
        .bind(timeframe.as_str())
        .bind(until)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut candles = rows
            .iter()
            .map(Self::candle_from_row)
            .collect::<StoreResult<Vec<Candle>>>()?;
        // Newest-first query for the limit; chronological for callers.
        candles.reverse();
        Ok(candles)
    }
}
