// tests/http_retrieval.rs
use incident_watch::{
    BackoffStrategy, BlockingPool, FetchError, HttpRetriever, RetryPolicy, RetryingFetcher,
    TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Example</title>
<entry><id>a</id><title>First</title><summary>Investigating</summary></entry>
<entry><id>b</id><title>Second</title><summary>Resolved</summary></entry>
</feed>"#;

/// Minimal HTTP/1.1 server answering every request with `status` and `body`.
/// Returns its base URL and a request counter.
async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while let Ok(n) = sock.read(&mut buf[read..]).await {
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                        break;
                    }
                }
                let resp = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/atom+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/history.atom"), hits)
}

fn fetcher(max_retries: u32) -> RetryingFetcher {
    RetryingFetcher::new(
        Arc::new(HttpRetriever::new(Duration::from_secs(5)).expect("client")),
        BlockingPool::new(2),
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(20),
            strategy: BackoffStrategy::Linear,
            max_delay: Duration::from_millis(100),
        },
    )
}

#[tokio::test]
async fn ok_response_is_downloaded_and_parsed_on_the_blocking_pool() {
    let (url, hits) = serve("200 OK", ATOM).await;

    let parsed = fetcher(2)
        .fetch(&url, &CancellationToken::new())
        .await
        .expect("fetch succeeds");

    assert!(!parsed.malformed, "{:?}", parsed.diagnostic);
    let ids: Vec<_> = parsed.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_2xx_status_is_retried_then_exhausted() {
    let (url, hits) = serve("503 Service Unavailable", "down for maintenance").await;

    let err = fetcher(2)
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted { attempts, last, .. } => {
            assert_eq!(attempts, 2);
            assert_eq!(last, TransportError::Status(503));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn html_error_page_with_200_is_flagged_malformed() {
    let (url, _) = serve("200 OK", "<html><body>maintenance</body></html>").await;

    let parsed = fetcher(1)
        .fetch(&url, &CancellationToken::new())
        .await
        .expect("transport succeeds");
    assert!(parsed.malformed);
}
