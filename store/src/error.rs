//! Store error types.

use fxfeed_common::Symbol;
use thiserror::Error;

/// Errors that can occur in the durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Pair not present in the directory.
    #[error("Pair not found: {0}")]
    PairNotFound(Symbol),

    /// Unique-constraint violation (e.g. seeding an existing pair).
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt stored value: {0}")]
    Decode(String),

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
