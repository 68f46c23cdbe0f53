// src/orchestrator.rs
//! Starts one watcher task per feed and supervises them until cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::feed::FeedSource;
use crate::fetcher::RetryingFetcher;
use crate::notify::AlertSink;
use crate::render::AlertRenderer;
use crate::watcher::Watcher;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub started: usize,
    /// Watchers that returned normally after cancellation.
    pub stopped: usize,
    /// Feed URLs whose watcher task panicked or was aborted.
    pub crashed: Vec<String>,
}

pub struct Orchestrator {
    fetcher: Arc<RetryingFetcher>,
    sink: Arc<dyn AlertSink>,
    renderer: AlertRenderer,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        sink: Arc<dyn AlertSink>,
        renderer: AlertRenderer,
    ) -> Self {
        Self {
            fetcher,
            sink,
            renderer,
        }
    }

    /// Run every feed concurrently until `cancel` fires and all watchers have
    /// wound down. Watchers share nothing but the fetcher's worker pool and the
    /// sink.
    pub async fn run(&self, sources: Vec<FeedSource>, cancel: CancellationToken) -> RunReport {
        let mut report = RunReport {
            started: sources.len(),
            ..RunReport::default()
        };
        if sources.is_empty() {
            return report;
        }

        info!(
            feeds = sources.len(),
            pool = self.fetcher.pool().capacity(),
            max_retries = self.fetcher.policy().attempts(),
            "watching {} feed(s)",
            sources.len()
        );

        let mut tasks = JoinSet::new();
        let mut urls = HashMap::with_capacity(sources.len());
        for source in sources {
            let url = source.url.clone();
            let watcher = Watcher::new(
                source,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.sink),
                self.renderer,
            );
            let handle = tasks.spawn(watcher.run(cancel.child_token()));
            urls.insert(handle.id(), url);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, _state)) => report.stopped += 1,
                Err(e) => {
                    let url = urls
                        .get(&e.id())
                        .cloned()
                        .unwrap_or_else(|| "<unknown>".to_string());
                    error!(feed = %url, error = %e, "watcher crashed");
                    report.crashed.push(url);
                }
            }
        }

        info!(stopped = report.stopped, crashed = report.crashed.len(), "all watchers finished");
        report
    }
}
