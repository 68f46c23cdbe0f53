// src/notify/webhook.rs
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Alert, AlertSink};
use crate::error::SinkError;

const QUEUE_CAPACITY: usize = 256;

/// Slack-compatible webhook (`{"text": ...}`).
///
/// `emit` only enqueues; a dedicated task posts in order, so a slow endpoint
/// never holds up a watcher.
pub struct WebhookSink {
    tx: mpsc::Sender<Alert>,
}

#[derive(Clone)]
struct Delivery {
    url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookSink {
    /// Spawn the delivery task on the current runtime.
    pub fn spawn(url: String) -> Self {
        Self::spawn_with(url, QUEUE_CAPACITY, 3).0
    }

    pub fn spawn_with(url: String, capacity: usize, max_retries: u8) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let delivery = Delivery {
            url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: max_retries.max(1),
        };
        let handle = tokio::spawn(delivery.run(rx));
        (Self { tx }, handle)
    }
}

#[derive(Serialize)]
struct WebhookPayload {
    text: String,
}

impl WebhookPayload {
    fn from_alert(alert: &Alert) -> Self {
        Self {
            text: format!(
                "*{}*\nStatus: {}\n@ {}",
                alert.product,
                alert.status,
                alert.timestamp_display()
            ),
        }
    }
}

impl Delivery {
    async fn run(self, mut rx: mpsc::Receiver<Alert>) {
        while let Some(alert) = rx.recv().await {
            if let Err(e) = self.post(&alert).await {
                tracing::warn!(feed = %alert.feed, entry = %alert.entry_id, "webhook delivery failed: {e:#}");
            }
        }
        tracing::debug!("webhook delivery task finished");
    }

    async fn post(&self, alert: &Alert) -> anyhow::Result<()> {
        let payload = WebhookPayload::from_alert(alert);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow::anyhow!("webhook HTTP error: {e}"),
                },
                Err(e) => anyhow::anyhow!("webhook request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl AlertSink for WebhookSink {
    async fn emit(&self, alert: &Alert) -> Result<(), SinkError> {
        self.tx.try_send(alert.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
