// src/config/watch.rs
//! Startup configuration: environment first, then an optional TOML/JSON file.
//!
//! Read once before the orchestrator starts; never re-read at runtime.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::FeedSource;
use crate::fetcher::{BackoffStrategy, RetryPolicy};

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";

pub const DEFAULT_STATUS_PAGES: &str = "https://status.openai.com";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_WORKER_POOL_SIZE: usize = 8;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

const FEED_SUFFIX: &str = "/history.atom";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertSettings {
    pub utc_offset_minutes: i32,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Ordered, duplicate-free.
    pub feeds: Vec<FeedSource>,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub worker_pool_size: usize,
    pub fetch_timeout: Duration,
    pub alerts: AlertSettings,
}

/* ----------------------------
File schema (TOML or JSON)
---------------------------- */

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    feeds: Vec<FileFeed>,
    retry: Option<FileRetry>,
    worker_pool_size: Option<usize>,
    fetch_timeout_secs: Option<u64>,
    alerts: Option<FileAlerts>,
}

#[derive(Debug, Deserialize)]
struct FileFeed {
    url: String,
    interval_secs: Option<u64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileRetry {
    max_retries: Option<u32>,
    backoff_secs: Option<u64>,
    strategy: Option<BackoffStrategy>,
    max_delay_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileAlerts {
    utc_offset_minutes: Option<i32>,
    webhook_url: Option<String>,
}

impl WatchConfig {
    /// Env + file fallbacks:
    /// 1) $WATCH_CONFIG_PATH (must exist)
    /// 2) config/watch.toml
    /// 3) config/watch.json
    /// 4) env only
    pub fn load() -> Result<Self> {
        let cfg = Self::from_env()?;
        match default_file_path()? {
            Some(path) => cfg.apply_file(&path),
            None => Ok(cfg),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable lookup (process env in production).
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_secs = parse_interval(get("POLL_INTERVAL").as_deref());
        let poll_interval = Duration::from_secs(interval_secs);

        let pages = get("STATUS_PAGES").unwrap_or_else(|| DEFAULT_STATUS_PAGES.to_string());
        let feeds = pages
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| FeedSource::new(feed_url_for(u), poll_interval))
            .collect();

        let defaults = RetryPolicy::default();
        let strategy = match get("RETRY_STRATEGY") {
            Some(raw) => raw.parse::<BackoffStrategy>().map_err(|e| anyhow!(e))?,
            None => defaults.strategy,
        };
        let retry = RetryPolicy {
            max_retries: parse_num(&get, "MAX_RETRIES", defaults.max_retries)?.max(1),
            base_delay: Duration::from_secs(parse_num(
                &get,
                "RETRY_BACKOFF",
                defaults.base_delay.as_secs(),
            )?),
            strategy,
            max_delay: Duration::from_secs(parse_num(
                &get,
                "RETRY_MAX_DELAY",
                defaults.max_delay.as_secs(),
            )?),
        };

        let webhook_url = get("ALERT_WEBHOOK_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let cfg = Self {
            feeds: dedup_feeds(feeds),
            poll_interval,
            retry,
            worker_pool_size: parse_num(&get, "WORKER_POOL_SIZE", DEFAULT_WORKER_POOL_SIZE)?.max(1),
            fetch_timeout: Duration::from_secs(
                parse_num(&get, "FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?.max(1),
            ),
            alerts: AlertSettings {
                utc_offset_minutes: parse_num(&get, "ALERT_UTC_OFFSET_MINUTES", 0i32)?,
                webhook_url,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay a TOML or JSON file. File values win; a non-empty `feeds`
    /// list replaces the env feed list.
    pub fn apply_file(self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watch config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let file = parse_file(&content, ext.as_str())
            .with_context(|| format!("parsing watch config {}", path.display()))?;
        self.merge(file)
    }

    fn merge(mut self, file: FileConfig) -> Result<Self> {
        if let Some(secs) = file.poll_interval_secs {
            let secs = sanitize_interval(secs);
            self.poll_interval = Duration::from_secs(secs);
            for f in &mut self.feeds {
                f.interval = self.poll_interval;
            }
        }

        if !file.feeds.is_empty() {
            let feeds = file
                .feeds
                .into_iter()
                .filter(|f| !f.url.trim().is_empty())
                .map(|f| {
                    let interval = f
                        .interval_secs
                        .map(|s| Duration::from_secs(sanitize_interval(s)))
                        .unwrap_or(self.poll_interval);
                    let mut source = FeedSource::new(feed_url_for(f.url.trim()), interval);
                    source.name = f.name.filter(|n| !n.trim().is_empty());
                    source
                })
                .collect();
            self.feeds = dedup_feeds(feeds);
        }

        if let Some(r) = file.retry {
            if let Some(n) = r.max_retries {
                self.retry.max_retries = n.max(1);
            }
            if let Some(s) = r.backoff_secs {
                self.retry.base_delay = Duration::from_secs(s);
            }
            if let Some(st) = r.strategy {
                self.retry.strategy = st;
            }
            if let Some(s) = r.max_delay_secs {
                self.retry.max_delay = Duration::from_secs(s);
            }
        }

        if let Some(n) = file.worker_pool_size {
            self.worker_pool_size = n.max(1);
        }
        if let Some(s) = file.fetch_timeout_secs {
            self.fetch_timeout = Duration::from_secs(s.max(1));
        }
        if let Some(a) = file.alerts {
            if let Some(m) = a.utc_offset_minutes {
                self.alerts.utc_offset_minutes = m;
            }
            if let Some(url) = a.webhook_url.map(|u| u.trim().to_string()) {
                self.alerts.webhook_url = Some(url).filter(|u| !u.is_empty());
            }
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("no feeds configured (set STATUS_PAGES or list [[feeds]] in the config file)");
        }
        Ok(())
    }
}

fn default_file_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/watch.toml");
    if toml_p.exists() {
        return Ok(Some(toml_p));
    }
    let json_p = PathBuf::from("config/watch.json");
    if json_p.exists() {
        return Ok(Some(json_p));
    }
    Ok(None)
}

fn parse_file(s: &str, hint_ext: &str) -> Result<FileConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON watch config");
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        // Unknown extension: JSON is the only other format we accept.
        Err(toml_err) if hint_ext != "toml" => serde_json::from_str(s)
            .map_err(|_| anyhow!(toml_err))
            .context("unsupported watch config format"),
        Err(e) => Err(e).context("invalid TOML watch config"),
    }
}

/// Poll interval in seconds. Unparsable → default; too low → default.
pub fn parse_interval(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_POLL_INTERVAL_SECS;
    };
    match raw.trim().parse::<u64>() {
        Ok(v) => sanitize_interval(v),
        Err(_) => {
            tracing::warn!(value = raw, "invalid POLL_INTERVAL, defaulting to {DEFAULT_POLL_INTERVAL_SECS}s");
            DEFAULT_POLL_INTERVAL_SECS
        }
    }
}

fn sanitize_interval(secs: u64) -> u64 {
    if secs < MIN_POLL_INTERVAL_SECS {
        tracing::warn!(value = secs, "poll interval too low, defaulting to {DEFAULT_POLL_INTERVAL_SECS}s");
        return DEFAULT_POLL_INTERVAL_SECS;
    }
    secs
}

/// Status page base URL → its Atom history feed. URLs that already name a
/// feed document are kept as-is.
pub fn feed_url_for(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    if [".atom", ".rss", ".xml"].iter().any(|ext| lower.ends_with(ext)) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{FEED_SUFFIX}")
    }
}

fn dedup_feeds(feeds: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    feeds
        .into_iter()
        .filter(|f| seen.insert(f.url.clone()))
        .collect()
}

fn parse_num<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {key}='{raw}': {e}")),
        _ => Ok(default),
    }
}
