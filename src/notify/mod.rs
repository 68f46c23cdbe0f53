//! Alert sinks: where a newly detected entry ends up.

pub mod console;
pub mod webhook;

use chrono::{DateTime, FixedOffset};
use metrics::counter;
use std::sync::{Arc, Mutex};

use crate::config::AlertSettings;
use crate::error::SinkError;
use crate::render::TIMESTAMP_FORMAT;

pub use console::ConsoleSink;
pub use webhook::WebhookSink;

/// One alert for one newly seen entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub feed: String,
    pub entry_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub product: String,
    pub status: String,
}

impl Alert {
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Destination for alerts. Implementations must return quickly; anything
/// slow (network) belongs on its own task.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn emit(&self, alert: &Alert) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// Fan-out to every configured sink. One failing sink does not stop the rest.
#[derive(Default)]
pub struct SinkMux {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl SinkMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Console always; webhook when a URL is configured. Must be called
    /// inside a Tokio runtime (the webhook spawns its delivery task).
    pub fn from_settings(settings: &AlertSettings) -> Self {
        let mut mux = Self::new().with(Arc::new(ConsoleSink::stdout()));
        if let Some(url) = settings.webhook_url.as_deref() {
            mux = mux.with(Arc::new(WebhookSink::spawn(url.to_string())));
        }
        mux
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl AlertSink for SinkMux {
    async fn emit(&self, alert: &Alert) -> Result<(), SinkError> {
        for sink in &self.sinks {
            if let Err(e) = sink.emit(alert).await {
                tracing::warn!(sink = sink.name(), feed = %alert.feed, error = %e, "alert sink failed");
                counter!("watch_sink_errors_total").increment(1);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

/// Keeps alerts in memory. Handy for embedding and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl AlertSink for MemorySink {
    async fn emit(&self, alert: &Alert) -> Result<(), SinkError> {
        if let Ok(mut v) = self.alerts.lock() {
            v.push(alert.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Failing;

    #[async_trait::async_trait]
    impl AlertSink for Failing {
        async fn emit(&self, _alert: &Alert) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn alert() -> Alert {
        Alert {
            feed: "status.example.com".into(),
            entry_id: "e1".into(),
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2025, 6, 10, 12, 0, 0)
                .unwrap(),
            product: "API".into(),
            status: "Investigating".into(),
        }
    }

    #[tokio::test]
    async fn mux_keeps_going_past_a_failing_sink() {
        let memory = Arc::new(MemorySink::new());
        let mux = SinkMux::new()
            .with(Arc::new(Failing))
            .with(memory.clone());
        assert_eq!(mux.len(), 2);

        mux.emit(&alert()).await.unwrap();
        assert_eq!(memory.alerts(), vec![alert()]);
    }

    #[test]
    fn timestamp_display_format() {
        assert_eq!(alert().timestamp_display(), "2025-06-10 12:00:00");
    }
}
