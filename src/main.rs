//! incident-watch: polls status-page incident feeds and alerts on new entries.
//!
//! All watchers share one current-thread runtime; fetches run on a bounded
//! blocking pool.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use incident_watch::shutdown::cancel_on_signal;
use incident_watch::telemetry::{ensure_metrics_described, init_tracing};
use incident_watch::{
    AlertRenderer, BlockingPool, HttpRetriever, Orchestrator, RetryingFetcher, SinkMux,
    WatchConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    ensure_metrics_described();

    let cfg = WatchConfig::load().context("loading watch configuration")?;

    let retriever = HttpRetriever::new(cfg.fetch_timeout)?;
    let pool = BlockingPool::new(cfg.worker_pool_size);
    let fetcher = Arc::new(RetryingFetcher::new(
        Arc::new(retriever),
        pool,
        cfg.retry.clone(),
    ));
    let sink = Arc::new(SinkMux::from_settings(&cfg.alerts));
    let renderer = AlertRenderer::new(cfg.alerts.utc_offset_minutes);
    info!(
        sinks = sink.len(),
        utc_offset_minutes = cfg.alerts.utc_offset_minutes,
        "alert sinks ready"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let report = Orchestrator::new(fetcher, sink, renderer)
        .run(cfg.feeds, cancel)
        .await;

    if report.crashed.is_empty() {
        info!(stopped = report.stopped, "incident-watch stopped");
    } else {
        warn!(crashed = ?report.crashed, "incident-watch stopped with crashed watchers");
    }
    Ok(())
}
