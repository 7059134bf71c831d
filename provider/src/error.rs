//! Provider error types.

use fxfeed_common::Symbol;
use thiserror::Error;

/// Errors that can occur while fetching rates from an upstream source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout, or non-success transport response.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Transport-level error from the HTTP client.
    #[error("Upstream unavailable: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered but the quote currency was absent.
    #[error("Quote currency not found in response for {symbol}")]
    QuoteNotFound { symbol: Symbol },

    /// Inversion of a zero rate.
    #[error("Cannot invert zero rate for {0}")]
    DivisionByZero(Symbol),

    /// Response body could not be decoded.
    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    /// Provider misconfiguration (e.g. missing API key).
    #[error("Provider configuration error: {0}")]
    Config(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
