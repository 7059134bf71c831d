//! OHLC candle aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fxfeed_common::{now, Candle, HistoryEntry, Symbol, Timeframe};
use fxfeed_store::{CandleStore, PairDirectory, PriceStore};
use tracing::{info, instrument, warn};

use crate::error::MarketResult;

/// Outcome of one aggregation run.
#[derive(Debug, PartialEq, Eq)]
pub struct AggregationSummary {
    pub timeframe: Timeframe,
    /// Active pairs examined.
    pub pairs_processed: usize,
    /// Candles written (one per touched bucket).
    pub candles_upserted: usize,
    /// Pairs that could not be aggregated this run.
    pub failed: usize,
    pub failed_symbols: Vec<Symbol>,
}

/// Rolls recent history entries into OHLC candles for one timeframe.
///
/// Re-running over the same history upserts identical candles, so
/// duplicate or overlapping runs are harmless.
pub struct AggregationJob {
    directory: Arc<dyn PairDirectory>,
    prices: Arc<dyn PriceStore>,
    candles: Arc<dyn CandleStore>,
}

impl AggregationJob {
    pub fn new(
        directory: Arc<dyn PairDirectory>,
        prices: Arc<dyn PriceStore>,
        candles: Arc<dyn CandleStore>,
    ) -> Self {
        Self {
            directory,
            prices,
            candles,
        }
    }

    /// Run one aggregation pass for the given timeframe.
    ///
    /// The lookback window is one bucket width ending now; buckets with
    /// no history in that window are left untouched, not backfilled.
    #[instrument(skip(self))]
    pub async fn run(&self, timeframe: Timeframe) -> MarketResult<AggregationSummary> {
        let pairs = self.directory.list_active().await?;
        let cutoff = now() - timeframe.duration();

        let mut summary = AggregationSummary {
            timeframe,
            pairs_processed: pairs.len(),
            candles_upserted: 0,
            failed: 0,
            failed_symbols: Vec::new(),
        };

        for pair in pairs {
            match self.aggregate_pair(&pair.symbol, timeframe, cutoff).await {
                Ok(upserted) => summary.candles_upserted += upserted,
                Err(e) => {
                    warn!(symbol = %pair.symbol, error = %e, "Aggregation failed for pair");
                    summary.failed += 1;
                    summary.failed_symbols.push(pair.symbol);
                }
            }
        }

        info!(
            timeframe = %timeframe,
            pairs = summary.pairs_processed,
            candles = summary.candles_upserted,
            failed = summary.failed,
            "Aggregation complete"
        );
        Ok(summary)
    }

    async fn aggregate_pair(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> MarketResult<usize> {
        let entries = self.prices.history_since(symbol, cutoff).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let buckets = fold_into_buckets(symbol, timeframe, &entries);
        let count = buckets.len();
        for candle in buckets.values() {
            self.candles.upsert(candle).await?;
        }
        Ok(count)
    }
}

/// Fold ascending history entries into one candle per bucket.
fn fold_into_buckets(
    symbol: &Symbol,
    timeframe: Timeframe,
    entries: &[HistoryEntry],
) -> BTreeMap<DateTime<Utc>, Candle> {
    let mut buckets: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
    for entry in entries {
        let bucket_start = timeframe.bucket_start(entry.observed_at);
        buckets
            .entry(bucket_start)
            .and_modify(|candle| candle.absorb(entry.price))
            .or_insert_with(|| {
                Candle::open_at(symbol.clone(), timeframe, bucket_start, entry.price)
            });
    }
    buckets
}
