// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use incident_watch::{
    BackoffStrategy, BlockingPool, FeedEntry, FeedRetriever, ParseResult, RetryPolicy,
    RetryingFetcher, TransportError,
};

pub type Response = Result<ParseResult, TransportError>;

/// Plays back queued responses; the last one repeats forever.
pub struct ScriptedRetriever {
    script: Mutex<VecDeque<Response>>,
    last: Mutex<Option<Response>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedRetriever {
    pub fn new(responses: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, r: Response) {
        self.script.lock().unwrap().push_back(r);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

impl FeedRetriever for ScriptedRetriever {
    fn fetch_and_parse(&self, _url: &str) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(r) => {
                *last = Some(r.clone());
                r
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".into()))),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Answers per URL; unknown URLs fail. Optional per-URL latency (blocking).
pub struct RoutedRetriever {
    routes: Vec<(String, Response, Duration)>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl RoutedRetriever {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: &str, r: Response, latency: Duration) -> Self {
        self.routes.push((url.to_string(), r, latency));
        self
    }

    pub fn calls_for(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, t)| *t)
            .collect()
    }
}

impl FeedRetriever for RoutedRetriever {
    fn fetch_and_parse(&self, url: &str) -> Response {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        match self.routes.iter().find(|(u, _, _)| u == url) {
            Some((_, r, latency)) => {
                std::thread::sleep(*latency);
                r.clone()
            }
            None => Err(TransportError::Connect("no route".into())),
        }
    }

    fn name(&self) -> &'static str {
        "routed"
    }
}

pub fn entries(ids: &[&str]) -> Vec<FeedEntry> {
    ids.iter()
        .map(|id| {
            FeedEntry::new(
                *id,
                format!("Incident {id}"),
                format!("<p><strong>Investigating</strong> - update for {id}</p>"),
            )
        })
        .collect()
}

pub fn feed(ids: &[&str]) -> Response {
    Ok(ParseResult::ok(entries(ids)))
}

pub fn malformed(diagnostic: &str) -> Response {
    Ok(ParseResult::malformed(diagnostic))
}

pub fn down() -> Response {
    Err(TransportError::Timeout)
}

/// Millisecond-scale retry policy so tests run in real time.
pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(20),
        strategy: BackoffStrategy::Linear,
        max_delay: Duration::from_millis(200),
    }
}

pub fn fetcher(retriever: Arc<dyn FeedRetriever>, max_retries: u32) -> Arc<RetryingFetcher> {
    Arc::new(RetryingFetcher::new(
        retriever,
        BlockingPool::new(4),
        fast_policy(max_retries),
    ))
}
