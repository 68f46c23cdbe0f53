// src/fetcher.rs
//! Retrying fetcher: one logical "get latest feed content" per poll cycle.

use metrics::{counter, histogram};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{FetchError, TransportError};
use crate::feed::{FeedRetriever, ParseResult};
use crate::pool::BlockingPool;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// base, 2*base, 3*base, ...
    #[default]
    Linear,
    /// base, 2*base, 4*base, ...
    Exponential,
}

impl std::str::FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" | "exp" => Ok(Self::Exponential),
            other => Err(format!("unknown backoff strategy '{other}'")),
        }
    }
}

/// Per-cycle retry budget. Resets fully on every scheduled poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per cycle (not "extra" attempts).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub strategy: BackoffStrategy,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
            strategy: BackoffStrategy::Linear,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based). Non-decreasing in
    /// `attempt`; capped at `max_delay` (never below `base_delay`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let raw = match self.strategy {
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let factor = 1u32 << (attempt - 1).min(31);
                self.base_delay.saturating_mul(factor)
            }
        };
        raw.min(self.max_delay.max(self.base_delay))
    }
}

pub struct RetryingFetcher {
    retriever: Arc<dyn FeedRetriever>,
    pool: BlockingPool,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(retriever: Arc<dyn FeedRetriever>, pool: BlockingPool, policy: RetryPolicy) -> Self {
        Self {
            retriever,
            pool,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    /// Fetch and parse `url`, retrying transport failures with backoff.
    ///
    /// The parse result is returned as-is; a malformed payload is *not* retried
    /// here. Cancellation is observed while waiting on the worker and during
    /// backoff sleeps.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ParseResult, FetchError> {
        ensure_metrics_described();

        let attempts = self.policy.attempts();
        let mut waited = Duration::ZERO;
        let mut last = TransportError::Other("no attempt made".to_string());

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            counter!("watch_fetch_attempts_total").increment(1);
            let retriever = Arc::clone(&self.retriever);
            let target = url.to_string();
            let t0 = Instant::now();

            let outcome = tokio::select! {
                r = self.pool.run(move || retriever.fetch_and_parse(&target)) => r?,
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            };
            histogram!("watch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            match outcome {
                Ok(parsed) => {
                    if attempt > 1 {
                        debug!(feed = %url, attempt, "fetch recovered after retry");
                    }
                    return Ok(parsed);
                }
                Err(e) => {
                    warn!(feed = %url, attempt, max = attempts, error = %e, "fetch attempt failed");
                    last = e;
                    if attempt < attempts {
                        let delay = self.policy.delay_for(attempt);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        }
                        waited += delay;
                    }
                }
            }
        }

        error!(feed = %url, attempts, error = %last, "all retries exhausted, skipping this cycle");
        counter!("watch_fetch_exhausted_total").increment(1);
        Err(FetchError::Exhausted {
            attempts,
            last,
            waited,
        })
    }
}
