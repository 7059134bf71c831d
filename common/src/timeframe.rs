//! Candle timeframes and bucket alignment.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for a timeframe outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported timeframe: {0}")]
pub struct UnsupportedTimeframe(pub String);

/// Fixed set of candle bucket widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// All supported timeframes, ascending by bucket width.
    pub const ALL: [Timeframe; 4] = [Timeframe::M5, Timeframe::M15, Timeframe::H1, Timeframe::D1];

    /// Width of one bucket.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::D1 => Duration::days(1),
        }
    }

    /// Floor a timestamp to the start of its bucket (UTC boundaries).
    pub fn bucket_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        // duration_trunc only fails for out-of-range timestamps.
        t.duration_trunc(self.duration()).unwrap_or(t)
    }

    /// Wire name of the timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = UnsupportedTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "1d" => Ok(Timeframe::D1),
            other => Err(UnsupportedTimeframe(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, h, m, s).unwrap()
    }

    #[test]
    fn five_minute_buckets_floor_to_boundary() {
        let tf = Timeframe::M5;
        assert_eq!(tf.bucket_start(at(12, 1, 0)), at(12, 0, 0));
        assert_eq!(tf.bucket_start(at(12, 4, 59)), at(12, 0, 0));
        assert_eq!(tf.bucket_start(at(12, 5, 0)), at(12, 5, 0));
    }

    #[test]
    fn fifteen_minute_buckets() {
        let tf = Timeframe::M15;
        assert_eq!(tf.bucket_start(at(9, 14, 59)), at(9, 0, 0));
        assert_eq!(tf.bucket_start(at(9, 29, 30)), at(9, 15, 0));
    }

    #[test]
    fn hourly_and_daily_buckets() {
        assert_eq!(Timeframe::H1.bucket_start(at(17, 42, 11)), at(17, 0, 0));
        assert_eq!(Timeframe::D1.bucket_start(at(17, 42, 11)), at(0, 0, 0));
    }

    #[test]
    fn parse_round_trips() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("4h".parse::<Timeframe>().is_err());
        assert!("".parse::<Timeframe>().is_err());
    }

    #[test]
    fn all_is_ascending_by_width() {
        for pair in Timeframe::ALL.windows(2) {
            assert!(pair[0].duration() < pair[1].duration());
        }
    }
}
