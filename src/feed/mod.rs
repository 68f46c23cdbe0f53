// src/feed/mod.rs
//! Feed-facing types and the retrieval seam.
//!
//! A [`FeedRetriever`] is the blocking "download + parse" capability. The
//! watch engine never calls it directly on the scheduler; it always goes
//! through [`crate::pool::BlockingPool`].

pub mod http;
pub mod parse;

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::TransportError;

pub use http::HttpRetriever;
pub use parse::parse_feed;

/// One feed to watch. Immutable once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub interval: Duration,
    /// Display label; falls back to the URL host.
    pub name: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            interval,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Human label used in alerts: configured name, else host, else the raw URL.
    pub fn label(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// One entry of a parsed feed. Compared for dedup by `id` only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    /// Raw (possibly HTML) summary/content.
    pub summary: String,
    pub updated: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: summary.into(),
            updated: None,
            published: None,
        }
    }
}

/// What the parser hands back. `malformed` mirrors a "this is garbage" flag;
/// validity is judged by [`crate::validate`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult {
    pub malformed: bool,
    pub diagnostic: Option<String>,
    /// Entries in document order.
    pub entries: Vec<FeedEntry>,
}

impl ParseResult {
    pub fn ok(entries: Vec<FeedEntry>) -> Self {
        Self {
            malformed: false,
            diagnostic: None,
            entries,
        }
    }

    pub fn malformed(diagnostic: impl Into<String>) -> Self {
        Self {
            malformed: true,
            diagnostic: Some(diagnostic.into()),
            entries: Vec::new(),
        }
    }
}

/// Blocking retrieve-and-parse. Must be callable from a worker thread.
pub trait FeedRetriever: Send + Sync + 'static {
    fn fetch_and_parse(&self, url: &str) -> Result<ParseResult, TransportError>;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}
