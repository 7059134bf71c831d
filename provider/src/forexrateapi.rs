//! ForexRateAPI rate provider.
//!
//! Uses the `/latest` endpoint. The API quotes one base currency
//! against any number of quote currencies per request, which is what
//! makes base-currency batching worthwhile.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use fxfeed_common::{now, Currency, PriceObservation, Symbol};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::RateProvider;

const FOREXRATEAPI_BASE_URL: &str = "https://api.forexrateapi.com/v1";

/// Bound on every upstream request unless overridden.
const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// ForexRateAPI market data provider.
///
/// Authenticates via an `api_key` query parameter. The `/latest`
/// endpoint has no bid/ask spread, so observations carry
/// bid = ask = price.
#[derive(Clone)]
pub struct ForexRateApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ForexRateApiProvider {
    /// Create from the `FOREX_RATE_API_KEY` environment variable.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("FOREX_RATE_API_KEY")
            .map_err(|_| ProviderError::Config("FOREX_RATE_API_KEY not set".into()))?;
        Self::new(api_key, None)
    }

    /// Create with explicit credentials and optional base URL override.
    pub fn new(api_key: String, base_url: Option<String>) -> ProviderResult<Self> {
        Self::with_timeout(api_key, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create with an explicit per-request timeout.
    pub fn with_timeout(
        api_key: String,
        base_url: Option<String>,
        timeout: std::time::Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Http)?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| FOREXRATEAPI_BASE_URL.to_string()),
        })
    }

    /// One `/latest` request: all rates for `base` against `quotes`.
    async fn fetch_rates(
        &self,
        base: &Currency,
        quotes: &[Currency],
    ) -> ProviderResult<HashMap<Currency, Decimal>> {
        let currencies = quotes
            .iter()
            .map(Currency::code)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("base", base.code()),
                ("currencies", &currencies),
            ])
            .send()
            .await?;

        let body: LatestResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("invalid /latest body: {e}")))?;

        if !body.success {
            let info = body
                .error
                .map(|e| e.info)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ProviderError::Upstream(format!(
                "ForexRateAPI error for base {base}: {info}"
            )));
        }

        let mut rates = HashMap::new();
        for (code, rate) in body.rates {
            // Unknown or malformed currency keys in the response are skipped.
            if let Ok(currency) = Currency::new(&code) {
                rates.insert(currency, rate);
            }
        }
        Ok(rates)
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    info: String,
}

#[async_trait]
impl RateProvider for ForexRateApiProvider {
    fn name(&self) -> &str {
        "forexrateapi"
    }

    async fn fetch_one(&self, symbol: &Symbol) -> ProviderResult<PriceObservation> {
        let rates = self
            .fetch_rates(symbol.base(), std::slice::from_ref(symbol.quote()))
            .await?;
        let rate = rates
            .get(symbol.quote())
            .copied()
            .ok_or_else(|| ProviderError::QuoteNotFound {
                symbol: symbol.clone(),
            })?;
        Ok(PriceObservation::flat(symbol.clone(), rate, now(), self.name()))
    }

    async fn fetch_batch(
        &self,
        symbols: &[Symbol],
    ) -> ProviderResult<HashMap<Symbol, PriceObservation>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        // One request per distinct base currency, each asking for all
        // quote currencies seen under that base.
        let mut groups: HashMap<Currency, Vec<Currency>> = HashMap::new();
        for symbol in symbols {
            let quotes = groups.entry(symbol.base().clone()).or_default();
            if !quotes.contains(symbol.quote()) {
                quotes.push(symbol.quote().clone());
            }
        }

        // Base-group requests run concurrently; `fetched` is the single
        // merge point for direct rates keyed by (base, quote).
        let fetched: DashMap<(Currency, Currency), Decimal> = DashMap::new();
        let mut tasks = JoinSet::new();
        for (base, quotes) in groups {
            let provider = self.clone();
            tasks.spawn(async move {
                let result = provider.fetch_rates(&base, &quotes).await;
                (base, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (base, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Batch group task failed");
                    continue;
                }
            };
            match result {
                Ok(rates) => {
                    for (quote, rate) in rates {
                        fetched.insert((base.clone(), quote), rate);
                    }
                }
                Err(e) => {
                    // A failed base group soft-fails its symbols only.
                    warn!(base = %base, error = %e, "Batch request failed for base group");
                }
            }
        }

        let direct: HashMap<(Currency, Currency), Decimal> = fetched.into_iter().collect();
        Ok(assemble_batch(symbols, &direct, self.name()))
    }
}

/// Build the batch result map from the direct rates obtained upstream.
///
/// Symbols without a direct rate are recovered through the inverse pair
/// when it was fetched in the same batch; symbols that are neither
/// directly fetched nor invertible stay absent from the map.
fn assemble_batch(
    symbols: &[Symbol],
    direct: &HashMap<(Currency, Currency), Decimal>,
    source: &str,
) -> HashMap<Symbol, PriceObservation> {
    let observed_at = now();
    let mut results = HashMap::new();

    for symbol in symbols {
        let key = (symbol.base().clone(), symbol.quote().clone());
        if let Some(rate) = direct.get(&key) {
            results.insert(
                symbol.clone(),
                PriceObservation::flat(symbol.clone(), *rate, observed_at, source),
            );
            continue;
        }

        let inverse_key = (symbol.quote().clone(), symbol.base().clone());
        if let Some(rate) = direct.get(&inverse_key) {
            match invert_rate(symbol, *rate) {
                Ok(inverted) => {
                    debug!(symbol = %symbol, "Derived rate from inverse pair");
                    results.insert(
                        symbol.clone(),
                        PriceObservation::flat(
                            symbol.clone(),
                            inverted,
                            observed_at,
                            format!("{source}-inverse"),
                        ),
                    );
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Cannot derive inverse rate");
                }
            }
        }
    }

    results
}

/// Compute the reciprocal of a direct rate with exact decimal arithmetic.
fn invert_rate(symbol: &Symbol, rate: Decimal) -> ProviderResult<Decimal> {
    Decimal::ONE
        .checked_div(rate)
        .ok_or_else(|| ProviderError::DivisionByZero(symbol.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn cur(c: &str) -> Currency {
        Currency::new(c).unwrap()
    }

    #[test]
    fn parse_latest_response_success() {
        let json = r#"{
            "success": true,
            "base": "EUR",
            "rates": {"USD": 1.0850, "GBP": 0.8680}
        }"#;
        let body: LatestResponse = serde_json::from_str(json).unwrap();
        assert!(body.success);
        assert_eq!(body.rates["USD"], dec!(1.0850));
        assert_eq!(body.rates["GBP"], dec!(0.8680));
    }

    #[test]
    fn parse_latest_response_error() {
        let json = r#"{
            "success": false,
            "error": {"code": 101, "info": "invalid api key"}
        }"#;
        let body: LatestResponse = serde_json::from_str(json).unwrap();
        assert!(!body.success);
        assert_eq!(body.error.unwrap().info, "invalid api key");
        assert!(body.rates.is_empty());
    }

    #[test]
    fn assemble_uses_direct_rates() {
        let symbols = vec![sym("EURUSD"), sym("EURGBP")];
        let mut direct = HashMap::new();
        direct.insert((cur("EUR"), cur("USD")), dec!(1.0850));
        direct.insert((cur("EUR"), cur("GBP")), dec!(0.8680));

        let results = assemble_batch(&symbols, &direct, "test");
        assert_eq!(results.len(), 2);
        assert_eq!(results[&sym("EURUSD")].price, dec!(1.0850));
        assert_eq!(results[&sym("EURUSD")].source, "test");
        assert_eq!(results[&sym("EURUSD")].bid, dec!(1.0850));
        assert_eq!(results[&sym("EURUSD")].ask, dec!(1.0850));
    }

    #[test]
    fn assemble_derives_inverse_when_direct_missing() {
        let symbols = vec![sym("USDEUR")];
        let mut direct = HashMap::new();
        direct.insert((cur("EUR"), cur("USD")), dec!(1.0850));

        let results = assemble_batch(&symbols, &direct, "test");
        let obs = &results[&sym("USDEUR")];
        assert_eq!(obs.price, Decimal::ONE / dec!(1.0850));
        assert_eq!(obs.source, "test-inverse");
    }

    #[test]
    fn assemble_prefers_direct_over_inverse() {
        let symbols = vec![sym("USDEUR")];
        let mut direct = HashMap::new();
        direct.insert((cur("USD"), cur("EUR")), dec!(0.9210));
        direct.insert((cur("EUR"), cur("USD")), dec!(1.0850));

        let results = assemble_batch(&symbols, &direct, "test");
        let obs = &results[&sym("USDEUR")];
        assert_eq!(obs.price, dec!(0.9210));
        assert_eq!(obs.source, "test");
    }

    #[test]
    fn assemble_leaves_unresolvable_symbols_absent() {
        let symbols = vec![sym("EURUSD"), sym("GBPJPY")];
        let mut direct = HashMap::new();
        direct.insert((cur("EUR"), cur("USD")), dec!(1.0850));

        let results = assemble_batch(&symbols, &direct, "test");
        assert_eq!(results.len(), 1);
        assert!(!results.contains_key(&sym("GBPJPY")));
    }

    #[test]
    fn assemble_skips_zero_rate_inversion() {
        let symbols = vec![sym("USDEUR")];
        let mut direct = HashMap::new();
        direct.insert((cur("EUR"), cur("USD")), Decimal::ZERO);

        let results = assemble_batch(&symbols, &direct, "test");
        assert!(results.is_empty());
    }

    #[test]
    fn invert_zero_rate_is_division_by_zero() {
        let err = invert_rate(&sym("USDEUR"), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ProviderError::DivisionByZero(_)));
    }

    #[test]
    fn invert_rate_reciprocal() {
        let inverted = invert_rate(&sym("USDEUR"), dec!(1.0850)).unwrap();
        assert_eq!(inverted, Decimal::ONE / dec!(1.0850));
    }

    proptest! {
        #[test]
        fn double_inversion_is_near_identity(raw in 1u64..10_000_000) {
            // Rates in (0.0001, 1000.0]
            let rate = Decimal::from(raw) / dec!(10000);
            let symbol = sym("EURUSD");
            let once = invert_rate(&symbol, rate).unwrap();
            let twice = invert_rate(&symbol, once).unwrap();
            let tolerance = rate * dec!(0.0000000001);
            prop_assert!((twice - rate).abs() <= tolerance);
        }
    }

    #[tokio::test]
    async fn fetch_batch_empty_input_is_noop() {
        let provider = ForexRateApiProvider::new("k".into(), None).unwrap();
        let results = provider.fetch_batch(&[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn builds_with_custom_timeout() {
        let provider = ForexRateApiProvider::with_timeout(
            "k".into(),
            Some("http://localhost:9".into()),
            std::time::Duration::from_millis(250),
        );
        assert!(provider.is_ok());
    }
}
