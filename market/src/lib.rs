//! FxFeed Market Layer
//!
//! Orchestration on top of the provider and store crates: the
//! cache-aside latest-price read path, candle listing, the periodic
//! polling job that feeds the price history log, and the idempotent
//! OHLC aggregation job, plus the scheduler that drives both.

pub mod aggregator;
pub mod cache;
pub mod candle_service;
pub mod config;
pub mod error;
pub mod poller;
pub mod price_service;
pub mod scheduler;

pub use aggregator::{AggregationJob, AggregationSummary};
pub use cache::{PriceCache, PriceCacheConfig, SharedPriceCache};
pub use candle_service::CandleService;
pub use config::MarketConfig;
pub use error::{MarketError, MarketResult};
pub use poller::{PollSummary, PollingJob};
pub use price_service::{BulkPrices, PriceService};
pub use scheduler::Scheduler;
