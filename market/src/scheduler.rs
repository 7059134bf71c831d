//! Job scheduling with bounded retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fxfeed_common::{DurationExt, Timeframe};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::aggregator::AggregationJob;
use crate::config::JobConfig;
use crate::error::MarketResult;
use crate::poller::PollingJob;

/// Run an operation with bounded exponential backoff.
///
/// The backoff doubles per attempt; the final error is returned after
/// `max_attempts` failures.
pub async fn run_with_retry<F, Fut, T>(
    name: &str,
    max_attempts: usize,
    backoff_base: Duration,
    mut op: F,
) -> MarketResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MarketResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let backoff = backoff_base * 2u32.saturating_pow(attempt as u32 - 1);
                warn!(
                    job = name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Job attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!(job = name, attempt, error = %e, "Job failed after final attempt");
                return Err(e);
            }
        }
    }
}

/// Drives the polling job on a fixed period and the aggregation job on
/// each timeframe's own period.
pub struct Scheduler {
    poller: Arc<PollingJob>,
    aggregator: Arc<AggregationJob>,
    config: JobConfig,
}

impl Scheduler {
    pub fn new(poller: Arc<PollingJob>, aggregator: Arc<AggregationJob>, config: JobConfig) -> Self {
        Self {
            poller,
            aggregator,
            config,
        }
    }

    /// Spawn the periodic job loops. Aborting the returned handles
    /// stops the scheduler.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let poller = self.poller.clone();
        let config = self.config.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let job = poller.clone();
                let result = run_with_retry(
                    "poll",
                    config.max_retries,
                    config.retry_backoff_base,
                    || async { job.run().await },
                )
                .await;
                if let Ok(summary) = result {
                    info!(updated = summary.updated, failed = summary.failed, "Poll tick done");
                }
            }
        }));

        for timeframe in Timeframe::ALL {
            let aggregator = self.aggregator.clone();
            let config = self.config.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(timeframe.duration().as_std());
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let job = aggregator.clone();
                    let _ = run_with_retry(
                        "aggregate",
                        config.max_retries,
                        config.retry_backoff_base,
                        || async { job.run(timeframe).await },
                    )
                    .await;
                }
            }));
        }

        handles
    }
}
