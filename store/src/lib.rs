//! FxFeed Durable Stores
//!
//! Store traits for the pair directory, price snapshot/history tables
//! and the candle table, with a Postgres implementation (sqlx) and an
//! in-memory implementation for tests and local development.
//!
//! The relational engine itself is outside FxFeed's scope; these traits
//! assume transactional upsert-by-unique-key, indexed range queries and
//! ordered reads, which both implementations provide.

pub mod candles;
pub mod directory;
pub mod error;
pub mod postgres;
pub mod prices;

pub use candles::{CandleStore, MemoryCandleStore};
pub use directory::{MemoryPairDirectory, PairDirectory};
pub use error::StoreError;
pub use postgres::PgMarketStore;
pub use prices::{MemoryPriceStore, PriceStore};
