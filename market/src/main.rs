//! FxFeed Daemon
//!
//! Polls FX rates into the price store and aggregates them into
//! candles until shut down.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxfeed_market::cache::PriceCacheConfig;
use fxfeed_market::{AggregationJob, MarketConfig, PollingJob, PriceCache, Scheduler};
use fxfeed_provider::ForexRateApiProvider;
use fxfeed_store::PgMarketStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting FxFeed daemon");

    // Load configuration
    let config = MarketConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Connect and migrate
    let store = Arc::new(PgMarketStore::connect(&config.database_url).await?);
    store.run_migrations().await?;
    info!("Database ready");

    let provider = Arc::new(ForexRateApiProvider::with_timeout(
        config.api_key.clone(),
        None,
        config.request_timeout,
    )?);
    let cache = Arc::new(PriceCache::with_config(PriceCacheConfig {
        price_ttl: chrono::Duration::from_std(config.cache.price_ttl)?,
        pairs_ttl: chrono::Duration::from_std(config.cache.pairs_ttl)?,
        max_entries: config.cache.max_entries,
    }));

    let poller = Arc::new(PollingJob::new(
        provider,
        store.clone(),
        store.clone(),
        cache.clone(),
    ));
    let aggregator = Arc::new(AggregationJob::new(store.clone(), store.clone(), store));

    let scheduler = Scheduler::new(poller, aggregator, config.jobs.clone());
    let handles = scheduler.spawn();
    info!(
        poll_interval_secs = config.jobs.poll_interval.as_secs(),
        "Scheduler running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    for handle in handles {
        handle.abort();
    }

    info!("FxFeed daemon shutdown complete");
    Ok(())
}
