//! Periodic price polling.

use std::collections::HashSet;
use std::sync::Arc;

use fxfeed_common::Symbol;
use fxfeed_provider::RateProvider;
use fxfeed_store::{PairDirectory, PriceStore};
use tracing::{error, info, instrument, warn};

use crate::cache::SharedPriceCache;
use crate::error::MarketResult;

/// Outcome of one polling run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Pairs whose snapshot and history were updated.
    pub updated: usize,
    /// Pairs that could not be updated this run.
    pub failed: usize,
    /// The symbols that failed.
    pub failed_symbols: Vec<Symbol>,
    /// Distinct base currencies in the batch (upstream call proxy).
    pub bases_queried: usize,
}

/// Fetches every active pair in one provider batch and records the
/// results: snapshot upsert plus history append per pair, then a cache
/// refresh. One failing pair never stops the run.
pub struct PollingJob {
    provider: Arc<dyn RateProvider>,
    directory: Arc<dyn PairDirectory>,
    prices: Arc<dyn PriceStore>,
    cache: SharedPriceCache,
}

impl PollingJob {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        directory: Arc<dyn PairDirectory>,
        prices: Arc<dyn PriceStore>,
        cache: SharedPriceCache,
    ) -> Self {
        Self {
            provider,
            directory,
            prices,
            cache,
        }
    }

    /// Run one polling pass over all active pairs.
    #[instrument(skip(self))]
    pub async fn run(&self) -> MarketResult<PollSummary> {
        let pairs = self.directory.list_active().await?;
        if pairs.is_empty() {
            info!("No active pairs, skipping poll");
            return Ok(PollSummary::default());
        }

        let symbols: Vec<Symbol> = pairs.into_iter().map(|p| p.symbol).collect();
        let bases_queried = symbols
            .iter()
            .map(|s| s.base().code().to_string())
            .collect::<HashSet<_>>()
            .len();

        let fetched = match self.provider.fetch_batch(&symbols).await {
            Ok(fetched) => fetched,
            Err(e) => {
                // Total provider failure: every pair fails, the job
                // itself succeeds and reports that.
                error!(error = %e, "Provider batch fetch failed");
                Default::default()
            }
        };

        let mut summary = PollSummary {
            bases_queried,
            ..Default::default()
        };

        for symbol in symbols {
            let Some(observation) = fetched.get(&symbol) else {
                warn!(symbol = %symbol, "No quote in batch response");
                summary.failed += 1;
                summary.failed_symbols.push(symbol);
                continue;
            };
            match self.prices.record_observation(observation).await {
                Ok(()) => {
                    self.cache.set_price(observation);
                    summary.updated += 1;
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Failed to record observation");
                    summary.failed += 1;
                    summary.failed_symbols.push(symbol);
                }
            }
        }

        info!(
            updated = summary.updated,
            failed = summary.failed,
            bases_queried = summary.bases_queried,
            "Poll complete"
        );
        Ok(summary)
    }
}
