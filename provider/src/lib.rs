//! FxFeed Rate Providers
//!
//! Abstraction over external FX rate sources, plus the ForexRateAPI
//! implementation with batched multi-currency fetch and rate inversion.
//!
//! # Batching
//!
//! `fetch_batch` groups the requested symbols by base currency and
//! issues one upstream request per group. A symbol whose direct rate is
//! missing is recovered from the inverse pair fetched in the same batch
//! when possible, so N symbols sharing K bases cost at most K calls.

pub mod error;
pub mod forexrateapi;
pub mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::ProviderError;
pub use forexrateapi::ForexRateApiProvider;
pub use provider::RateProvider;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateProvider;
