//! Tracing subscriber setup and metric descriptions.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "incident_watch=info,warn";

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` overrides the filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// One-time metrics registration (so series carry descriptions once a recorder exists).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_polls_total", "Poll cycles started across all feeds.");
        describe_counter!("watch_seeded_total", "Feeds that completed their seeding poll.");
        describe_counter!("watch_alerts_total", "Alerts emitted for newly seen entries.");
        describe_counter!("watch_fetch_attempts_total", "Individual fetch attempts.");
        describe_counter!(
            "watch_fetch_exhausted_total",
            "Cycles skipped after every retry failed."
        );
        describe_counter!("watch_malformed_total", "Cycles skipped on malformed payloads.");
        describe_counter!("watch_sink_errors_total", "Alert deliveries a sink rejected.");
        describe_histogram!("watch_fetch_ms", "Fetch+parse time per attempt in milliseconds.");
    });
}
