//! OHLCV candle type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;
use crate::timeframe::Timeframe;

/// An OHLCV aggregate over one fixed time bucket.
///
/// Unique per (symbol, timeframe, bucket_start). Volume is carried for
/// schema compatibility but is always zero: the rate provider exposes
/// no trade volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    /// Bucket start, aligned to the timeframe boundary in UTC.
    pub bucket_start: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Open a new candle from the first price seen in a bucket.
    pub fn open_at(
        symbol: Symbol,
        timeframe: Timeframe,
        bucket_start: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            bucket_start,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
        }
    }

    /// Fold a subsequent price into the candle.
    ///
    /// High and low only widen; close always tracks the latest price,
    /// so folding entries in ascending time order yields the correct
    /// OHLC for the bucket.
    pub fn absorb(&mut self, price: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }

    /// Check the OHLC invariant: low <= open, close <= high.
    pub fn is_coherent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn absorb_tracks_extremes_and_close() {
        let start = Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap();
        let mut candle = Candle::open_at(
            Symbol::parse("EURUSD").unwrap(),
            Timeframe::M5,
            start,
            dec!(1.0800),
        );
        candle.absorb(dec!(1.0850));
        candle.absorb(dec!(1.0790));

        assert_eq!(candle.open, dec!(1.0800));
        assert_eq!(candle.high, dec!(1.0850));
        assert_eq!(candle.low, dec!(1.0790));
        assert_eq!(candle.close, dec!(1.0790));
        assert_eq!(candle.volume, Decimal::ZERO);
        assert!(candle.is_coherent());
    }
}
