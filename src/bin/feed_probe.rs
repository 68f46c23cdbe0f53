//! Fetch one feed once and print what the watcher would see.
//!
//! Usage: `feed-probe <status page or feed URL>` (defaults to the first
//! configured feed).

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use incident_watch::config::watch::feed_url_for;
use incident_watch::notify::console::format_block;
use incident_watch::telemetry::init_tracing;
use incident_watch::validate::validate;
use incident_watch::{
    AlertRenderer, BlockingPool, FeedSource, HttpRetriever, RetryingFetcher, WatchConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load().context("loading watch configuration")?;
    let source = match std::env::args().nth(1) {
        Some(arg) => FeedSource::new(feed_url_for(&arg), cfg.poll_interval),
        None => match cfg.feeds.first() {
            Some(f) => f.clone(),
            None => bail!("no feed URL given and none configured"),
        },
    };

    let fetcher = RetryingFetcher::new(
        Arc::new(HttpRetriever::new(cfg.fetch_timeout)?),
        BlockingPool::new(1),
        cfg.retry.clone(),
    );
    let parsed = fetcher
        .fetch(&source.url, &CancellationToken::new())
        .await
        .with_context(|| format!("fetching {}", source.url))?;
    let entries = validate(parsed).with_context(|| format!("validating {}", source.url))?;

    let renderer = AlertRenderer::new(cfg.alerts.utc_offset_minutes);
    let label = source.label();
    let now = Utc::now();

    println!("{} ({} entries)", source.url, entries.len());
    for entry in &entries {
        println!("\nid: {}\ntitle: {}", entry.id, entry.title);
        print!("{}", format_block(&renderer.render(&label, entry, now)));
    }
    Ok(())
}
