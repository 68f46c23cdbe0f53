// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod notify;
pub mod orchestrator;
pub mod pool;
pub mod render;
pub mod shutdown;
pub mod telemetry;
pub mod validate;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::config::{AlertSettings, WatchConfig};
pub use crate::error::{FetchError, MalformedFeed, SinkError, TransportError};
pub use crate::feed::{FeedEntry, FeedRetriever, FeedSource, HttpRetriever, ParseResult};
pub use crate::fetcher::{BackoffStrategy, RetryPolicy, RetryingFetcher};
pub use crate::notify::{Alert, AlertSink, MemorySink, SinkMux};
pub use crate::orchestrator::{Orchestrator, RunReport};
pub use crate::pool::BlockingPool;
pub use crate::render::AlertRenderer;
pub use crate::watcher::{CycleOutcome, Phase, Watcher, WatcherState};
