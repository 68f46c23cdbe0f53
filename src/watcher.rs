//! Per-feed polling state machine.
//!
//! A [`Watcher`] owns its [`WatcherState`] outright. Nothing else can reach it,
//! so one feed's seeding can never make another feed look initialized.

use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dedup::SeenIds;
use crate::error::FetchError;
use crate::feed::{FeedEntry, FeedSource};
use crate::fetcher::RetryingFetcher;
use crate::notify::AlertSink;
use crate::render::AlertRenderer;
use crate::telemetry::ensure_metrics_described;
use crate::validate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no network activity yet.
    Starting,
    /// Waiting for the first successful, valid poll.
    Seeding,
    Polling,
}

/// What one cycle did. State is only touched by `Seeded` and `Polled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Seeded { recorded: usize },
    Polled { alerts: usize },
    FetchFailed,
    Malformed,
    Cancelled,
}

impl CycleOutcome {
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Seeded { .. } | Self::Polled { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    initialized: bool,
    seen: SeenIds,
}

impl WatcherState {
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn seen(&self) -> &SeenIds {
        &self.seen
    }
}

pub struct Watcher {
    source: FeedSource,
    label: String,
    fetcher: Arc<RetryingFetcher>,
    sink: Arc<dyn AlertSink>,
    renderer: AlertRenderer,
    state: WatcherState,
    phase: Phase,
}

impl Watcher {
    pub fn new(
        source: FeedSource,
        fetcher: Arc<RetryingFetcher>,
        sink: Arc<dyn AlertSink>,
        renderer: AlertRenderer,
    ) -> Self {
        let label = source.label();
        Self {
            source,
            label,
            fetcher,
            sink,
            renderer,
            state: WatcherState::default(),
            phase: Phase::Starting,
        }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// One fetch → validate → dedup → emit cycle.
    ///
    /// Any failure leaves the state exactly as it was. A cancelled fetch counts
    /// as a failed cycle, never as a partial seed.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        ensure_metrics_described();
        if self.phase == Phase::Starting {
            self.phase = Phase::Seeding;
        }
        counter!("watch_polls_total").increment(1);

        let parsed = match self.fetcher.fetch(&self.source.url, cancel).await {
            Ok(p) => p,
            Err(FetchError::Cancelled) => return CycleOutcome::Cancelled,
            Err(e) => {
                warn!(feed = %self.source.url, error = %e, "skipping cycle");
                return CycleOutcome::FetchFailed;
            }
        };

        let entries = match validate(parsed) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(feed = %self.source.url, diagnostic = %e.diagnostic, "malformed feed, skipping cycle");
                counter!("watch_malformed_total").increment(1);
                return CycleOutcome::Malformed;
            }
        };
        let entries = self.drop_anonymous(entries);

        if !self.state.initialized {
            let recorded = self.state.seen.seed(&entries);
            self.state.initialized = true;
            self.phase = Phase::Polling;
            counter!("watch_seeded_total").increment(1);
            info!(feed = %self.source.url, entries = recorded, "feed seeded");
            return CycleOutcome::Seeded { recorded };
        }

        let fresh = self.state.seen.admit(entries);
        let now = Utc::now();
        for entry in &fresh {
            let alert = self.renderer.render(&self.label, entry, now);
            info!(feed = %self.source.url, entry = %entry.id, product = %alert.product, "new entry");
            counter!("watch_alerts_total").increment(1);
            if let Err(e) = self.sink.emit(&alert).await {
                warn!(feed = %self.source.url, sink = self.sink.name(), error = %e, "alert sink failed");
                counter!("watch_sink_errors_total").increment(1);
            }
        }
        CycleOutcome::Polled {
            alerts: fresh.len(),
        }
    }

    /// Poll until cancelled. The interval sleep follows every cycle, whatever
    /// its outcome. Returns the final state.
    pub async fn run(mut self, cancel: CancellationToken) -> WatcherState {
        info!(feed = %self.source.url, interval_secs = self.source.interval.as_secs(), "subscribed");

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = self.poll_once(&cancel).await;
            if outcome == CycleOutcome::Cancelled {
                break;
            }
            if outcome.is_skip() {
                debug!(feed = %self.source.url, ?outcome, "cycle skipped, state kept");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.source.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!(feed = %self.source.url, seen = self.state.seen.len(), "watcher stopped");
        self.state
    }

    fn drop_anonymous(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        entries
            .into_iter()
            .filter(|e| {
                let keep = !e.id.trim().is_empty();
                if !keep {
                    debug!(feed = %self.source.url, title = %e.title, "entry without id skipped");
                }
                keep
            })
            .collect()
    }
}
