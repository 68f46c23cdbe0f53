//! Turning a feed entry into an alert: HTML cleanup, component extraction,
//! status line and display timestamp.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::feed::FeedEntry;
use crate::notify::Alert;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^<]+?>").expect("tag regex"))
}

fn re_list_items() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").expect("li regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[ \t\u{a0}]+").expect("ws regex"))
}

/// Strip tags and decode entities. Line breaks in the source are kept.
pub fn clean_html(html: &str) -> String {
    let stripped = re_tags().replace_all(html, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    re_ws().replace_all(&decoded, " ").trim().to_string()
}

/// Affected components, listed by status pages as `<li>` items.
pub fn extract_components(html: &str) -> Vec<String> {
    re_list_items()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| clean_html(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Last non-empty line of an already cleaned summary.
pub fn extract_status_line(clean_summary: &str) -> String {
    clean_summary
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_else(|| clean_summary.trim())
        .to_string()
}

/// Renders entries into alerts with timestamps shifted to a display offset.
#[derive(Debug, Clone, Copy)]
pub struct AlertRenderer {
    offset: FixedOffset,
}

impl Default for AlertRenderer {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl AlertRenderer {
    /// Out-of-range offsets fall back to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `label` is the feed's display label; `now` stands in for entries
    /// without any timestamp.
    pub fn render(&self, label: &str, entry: &FeedEntry, now: DateTime<Utc>) -> Alert {
        let components = extract_components(&entry.summary);
        let product = if components.is_empty() {
            if entry.title.trim().is_empty() {
                label.to_string()
            } else {
                entry.title.trim().to_string()
            }
        } else {
            format!("{label} - {}", components.join(", "))
        };

        let clean = clean_html(&entry.summary);
        let status = if clean.is_empty() {
            entry.title.trim().to_string()
        } else {
            extract_status_line(&clean)
        };

        let at = entry.updated.or(entry.published).unwrap_or(now);

        Alert {
            feed: label.to_string(),
            entry_id: entry.id.clone(),
            timestamp: at.with_timezone(&self.offset),
            product,
            status,
        }
    }
}
