//! Bounded offload for blocking work.
//!
//! `spawn_blocking` alone would let a large feed list pile up an unbounded
//! number of blocking jobs; a semaphore caps how many run at once.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BlockingPool {
    /// `capacity` of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on a blocking thread once a slot is free, and await its result.
    ///
    /// Dropping the returned future detaches the job; its slot is released
    /// when the job itself finishes.
    pub async fn run<F, T>(&self, job: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Pool("worker pool closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| FetchError::Pool(e.to_string()))
    }
}
