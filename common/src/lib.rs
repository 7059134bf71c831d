//! FxFeed Common Types
//!
//! This crate contains shared types used across the FxFeed services,
//! including currency symbols, price observations, candle timeframes,
//! and time utilities.

pub mod candle;
pub mod observation;
pub mod symbol;
pub mod time;
pub mod timeframe;

pub use candle::*;
pub use observation::*;
pub use symbol::*;
pub use time::*;
pub use timeframe::*;
