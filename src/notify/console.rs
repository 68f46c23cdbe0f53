// src/notify/console.rs
use std::io::Write;
use std::sync::Mutex;

use super::{Alert, AlertSink};
use crate::error::SinkError;

/// Prints alerts as a small block:
///
/// ```text
/// [2025-06-10 18:00:00] Product: OpenAI - Chat Completions
/// Status: Resolved - Error rates are back to normal.
/// ------------------------------------------------------------
/// ```
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::to_writer(Box::new(std::io::stdout()))
    }

    pub fn to_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

pub fn format_block(alert: &Alert) -> String {
    format!(
        "\n[{}] Product: {}\nStatus: {}\n{}\n",
        alert.timestamp_display(),
        alert.product,
        alert.status,
        "-".repeat(60)
    )
}

#[async_trait::async_trait]
impl AlertSink for ConsoleSink {
    async fn emit(&self, alert: &Alert) -> Result<(), SinkError> {
        let block = format_block(alert);
        let mut out = match self.out.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        out.write_all(block.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
