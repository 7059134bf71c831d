//! Currency and symbol types for FX pairs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a raw symbol string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid symbol format: {0}")]
pub struct InvalidSymbol(pub String);

/// ISO 4217 currency code (three ASCII letters, stored uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a three-letter code.
    pub fn new(code: impl AsRef<str>) -> Result<Self, InvalidSymbol> {
        let code = code.as_ref().to_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(InvalidSymbol(code))
        }
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = InvalidSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A tradable two-currency symbol (e.g. `EURUSD`).
///
/// Parsing accepts either the 6-letter concatenation or the slash form
/// (`EUR/USD`), case-insensitive. Degenerate pairs with base == quote
/// are rejected. The canonical rendering is always the 6-letter
/// uppercase concatenation, so normalization is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: Currency,
    quote: Currency,
}

impl Symbol {
    /// Create a symbol from its two currencies.
    pub fn new(base: Currency, quote: Currency) -> Result<Self, InvalidSymbol> {
        if base == quote {
            return Err(InvalidSymbol(format!("{base}{quote}")));
        }
        Ok(Self { base, quote })
    }

    /// Parse a raw symbol string (`EURUSD` or `EUR/USD`).
    pub fn parse(raw: &str) -> Result<Self, InvalidSymbol> {
        let raw = raw.trim();
        let (base, quote) = match raw.split_once('/') {
            Some((b, q)) => (b, q),
            // Byte length 6 alone is not enough: multi-byte input must
            // not be split mid-character.
            None if raw.len() == 6 && raw.is_char_boundary(3) => raw.split_at(3),
            None => return Err(InvalidSymbol(raw.to_string())),
        };
        let base = Currency::new(base).map_err(|_| InvalidSymbol(raw.to_string()))?;
        let quote = Currency::new(quote).map_err(|_| InvalidSymbol(raw.to_string()))?;
        Self::new(base, quote).map_err(|_| InvalidSymbol(raw.to_string()))
    }

    /// Base currency (being bought/sold).
    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// Quote currency (pricing currency).
    pub fn quote(&self) -> &Currency {
        &self.quote
    }

    /// Get the inverse symbol (quote/base).
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Canonical 6-letter rendering.
    pub fn as_str(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = InvalidSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = InvalidSymbol;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> String {
        s.as_str()
    }
}

/// A forex pair known to the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    /// The pair's symbol (unique identity).
    pub symbol: Symbol,
    /// Whether the pair is currently tradable.
    pub active: bool,
}

impl Pair {
    /// Create an active pair.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            active: true,
        }
    }

    /// Create a pair with an explicit activation state.
    pub fn with_active(symbol: Symbol, active: bool) -> Self {
        Self { symbol, active }
    }
}
