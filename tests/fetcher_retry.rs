// tests/fetcher_retry.rs
mod common;

use common::{down, fast_policy, feed, ScriptedRetriever};
use incident_watch::{
    BackoffStrategy, BlockingPool, FetchError, RetryPolicy, RetryingFetcher, TransportError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const URL: &str = "https://status.example.com/history.atom";

fn fetcher_with(r: Arc<ScriptedRetriever>, policy: RetryPolicy) -> RetryingFetcher {
    RetryingFetcher::new(r, BlockingPool::new(2), policy)
}

#[tokio::test]
async fn makes_exactly_max_retries_attempts() {
    let r = ScriptedRetriever::new(vec![down()]);
    let f = fetcher_with(r.clone(), fast_policy(4));

    let err = f.fetch(URL, &CancellationToken::new()).await.unwrap_err();
    match err {
        FetchError::Exhausted {
            attempts,
            last,
            waited,
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last, TransportError::Timeout);
            // 20 + 40 + 60 ms; nothing after the last attempt
            assert_eq!(waited, Duration::from_millis(120));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(r.calls(), 4);
}

#[tokio::test]
async fn gaps_between_attempts_do_not_shrink() {
    let r = ScriptedRetriever::new(vec![down()]);
    let policy = RetryPolicy {
        max_retries: 4,
        base_delay: Duration::from_millis(30),
        strategy: BackoffStrategy::Exponential,
        max_delay: Duration::from_secs(1),
    };
    let f = fetcher_with(r.clone(), policy.clone());
    let _ = f.fetch(URL, &CancellationToken::new()).await;

    let times = r.call_times();
    assert_eq!(times.len(), 4);
    let gaps: Vec<_> = times.windows(2).map(|w| w[1] - w[0]).collect();
    for (i, gap) in gaps.iter().enumerate() {
        assert!(
            *gap >= policy.delay_for(i as u32 + 1),
            "gap {i} was {gap:?}, expected at least {:?}",
            policy.delay_for(i as u32 + 1)
        );
    }
}

#[tokio::test]
async fn recovers_when_a_later_attempt_succeeds() {
    let r = ScriptedRetriever::new(vec![down(), feed(&["e1"])]);
    let f = fetcher_with(r.clone(), fast_policy(3));

    let parsed = f.fetch(URL, &CancellationToken::new()).await.unwrap();
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(r.calls(), 2);
}

#[tokio::test]
async fn malformed_payload_is_returned_not_retried() {
    let r = ScriptedRetriever::new(vec![common::malformed("bad xml"), feed(&["e1"])]);
    let f = fetcher_with(r.clone(), fast_policy(3));

    let parsed = f.fetch(URL, &CancellationToken::new()).await.unwrap();
    assert!(parsed.malformed);
    assert_eq!(r.calls(), 1);
}

#[tokio::test]
async fn budget_resets_every_call() {
    let r = ScriptedRetriever::new(vec![down()]);
    let f = fetcher_with(r.clone(), fast_policy(2));
    let cancel = CancellationToken::new();

    assert!(f.fetch(URL, &cancel).await.is_err());
    assert!(f.fetch(URL, &cancel).await.is_err());
    assert_eq!(r.calls(), 4);
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
    let r = ScriptedRetriever::new(vec![down()]);
    let policy = RetryPolicy {
        max_retries: 5,
        base_delay: Duration::from_secs(30),
        ..RetryPolicy::default()
    };
    let f = fetcher_with(r.clone(), policy);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let t0 = Instant::now();
    let err = f.fetch(URL, &cancel).await.unwrap_err();
    assert!(matches!(err, FetchError::Cancelled));
    assert!(t0.elapsed() < Duration::from_secs(5));
    assert_eq!(r.calls(), 1);
}

#[tokio::test]
async fn panicking_retriever_surfaces_as_pool_error() {
    struct Exploding;
    impl incident_watch::FeedRetriever for Exploding {
        fn fetch_and_parse(&self, _url: &str) -> common::Response {
            panic!("parser bug")
        }
        fn name(&self) -> &'static str {
            "exploding"
        }
    }

    let f = RetryingFetcher::new(Arc::new(Exploding), BlockingPool::new(1), fast_policy(3));
    let err = f.fetch(URL, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, FetchError::Pool(_)));
    assert_eq!(f.pool().available(), 1);
}
