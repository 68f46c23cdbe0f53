// src/feed/http.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::runtime::Handle;

use super::{parse_feed, FeedRetriever, ParseResult};
use crate::error::TransportError;

const USER_AGENT: &str = concat!("incident-watch/", env!("CARGO_PKG_VERSION"));

/// HTTP retriever. Runs on a blocking worker and drives the async client via
/// the runtime handle; the runtime's own thread keeps polling IO meanwhile.
pub struct HttpRetriever {
    client: Client,
}

impl HttpRetriever {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building feed HTTP client")?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> std::result::Result<String, TransportError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

impl FeedRetriever for HttpRetriever {
    fn fetch_and_parse(&self, url: &str) -> std::result::Result<ParseResult, TransportError> {
        let handle = Handle::try_current()
            .map_err(|e| TransportError::Other(format!("no async runtime available: {e}")))?;
        let body = handle.block_on(self.download(url))?;
        Ok(parse_feed(&body))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
