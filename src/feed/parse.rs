// src/feed/parse.rs
//! Atom / RSS 2.0 decoding into [`ParseResult`].
//!
//! Broken input never returns an error: it comes back flagged `malformed`
//! with a diagnostic, and the validator decides what to do with it.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use super::{FeedEntry, ParseResult};

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<Text>,
    updated: Option<String>,
    published: Option<String>,
    summary: Option<Text>,
    content: Option<Text>,
}

/// Element whose attributes we ignore (`type="html"`, `isPermaLink`, ...).
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Text>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Decode a feed document. Entries keep document order.
pub fn parse_feed(xml: &str) -> ParseResult {
    let xml = scrub_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));

    let root = match scan_document(&xml) {
        Ok(root) => root,
        Err(diagnostic) => return ParseResult::malformed(diagnostic),
    };

    match root.as_str() {
        "feed" => parse_atom(&xml),
        "rss" => parse_rss(&xml),
        other => ParseResult::malformed(format!("unrecognized root element <{other}>")),
    }
}

fn parse_atom(xml: &str) -> ParseResult {
    let feed: AtomFeed = match from_str(xml) {
        Ok(f) => f,
        Err(e) => return ParseResult::malformed(format!("atom decode failed: {e}")),
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|e| FeedEntry {
            id: e.id.unwrap_or_default().trim().to_string(),
            title: e.title.map(|t| t.value.trim().to_string()).unwrap_or_default(),
            summary: e.summary.or(e.content).map(|t| t.value).unwrap_or_default(),
            updated: e.updated.as_deref().and_then(parse_timestamp),
            published: e.published.as_deref().and_then(parse_timestamp),
        })
        .collect();

    ParseResult::ok(entries)
}

fn parse_rss(xml: &str) -> ParseResult {
    let rss: Rss = match from_str(xml) {
        Ok(r) => r,
        Err(e) => return ParseResult::malformed(format!("rss decode failed: {e}")),
    };

    let entries = rss
        .channel
        .items
        .into_iter()
        .map(|it| {
            // RSS has no mandatory id; guid first, link as the stable fallback.
            let id = it
                .guid
                .map(|g| g.value.trim().to_string())
                .filter(|g| !g.is_empty())
                .or_else(|| it.link.as_deref().map(str::trim).map(str::to_string))
                .unwrap_or_default();
            let published = it.pub_date.as_deref().and_then(parse_timestamp);
            FeedEntry {
                id,
                title: it.title.unwrap_or_default().trim().to_string(),
                summary: it.description.unwrap_or_default(),
                updated: published,
                published,
            }
        })
        .collect();

    ParseResult::ok(entries)
}

/// Walk the whole document once: it must be well-formed and have a root.
fn scan_document(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut root: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("XML error: {e}")),
        }
    }

    if depth > 0 {
        return Err(format!("unexpected end of document ({depth} unclosed elements)"));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// RFC 3339 (Atom) or RFC 2822 (RSS).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTML named entities are not XML; status pages leak them into raw feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
