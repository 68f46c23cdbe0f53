//! Failure taxonomy for one watch cycle.
//!
//! Nothing in here is fatal to the process: every variant ends up as a logged
//! diagnostic and a skipped cycle.

use std::time::Duration;

/// One fetch attempt failed at the transport level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Outcome of a retrying fetch that did not produce a parse result.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("all {attempts} attempts failed (last: {last})")]
    Exhausted {
        attempts: u32,
        last: TransportError,
        waited: Duration,
    },
    #[error("fetch cancelled by shutdown")]
    Cancelled,
    #[error("blocking worker failed: {0}")]
    Pool(String),
}

/// The payload came back but the parser flagged it as garbage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed feed: {diagnostic}")]
pub struct MalformedFeed {
    pub diagnostic: String,
}

/// An alert sink could not deliver.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink queue full, alert dropped")]
    QueueFull,
    #[error("sink closed")]
    Closed,
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
