//! Candle listing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fxfeed_common::{Candle, Symbol, Timeframe};
use fxfeed_store::{CandleStore, PairDirectory};

use crate::error::MarketResult;

const DEFAULT_LIMIT: usize = 100;

/// Read side of the candle table.
pub struct CandleService {
    directory: Arc<dyn PairDirectory>,
    candles: Arc<dyn CandleStore>,
    max_limit: usize,
}

impl CandleService {
    pub fn new(
        directory: Arc<dyn PairDirectory>,
        candles: Arc<dyn CandleStore>,
        max_limit: usize,
    ) -> Self {
        Self {
            directory,
            candles,
            max_limit,
        }
    }

    /// List candles for a pair and timeframe, oldest first.
    ///
    /// `limit` defaults to 100 and is clamped to the configured
    /// maximum; `until` bounds the bucket start from above. When more
    /// candles match than the limit allows, the newest ones win.
    pub async fn list_candles(
        &self,
        raw_symbol: &str,
        raw_timeframe: &str,
        limit: Option<usize>,
        until: Option<DateTime<Utc>>,
    ) -> MarketResult<Vec<Candle>> {
        let symbol = Symbol::parse(raw_symbol)?;
        let timeframe: Timeframe = raw_timeframe.parse()?;
        // Candles of deactivated pairs stay readable.
        self.directory.resolve(&symbol).await?;

        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(self.max_limit).max(1);
        let candles = self.candles.list(&symbol, timeframe, limit, until).await?;
        Ok(candles)
    }

    /// The supported timeframes, ascending by bucket width.
    pub fn supported_timeframes(&self) -> &'static [Timeframe] {
        &Timeframe::ALL
    }
}
