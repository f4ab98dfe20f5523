//! Integration tests for the retrying HTTP fetcher

use allpages_harvester::config::HttpConfig;
use allpages_harvester::crawler::{FetchError, HttpFetcher, PageSource};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_attempts: u32, server: &MockServer) -> (HttpFetcher, Url) {
    let config = HttpConfig {
        retry_max_attempts: max_attempts,
        retry_backoff_base_ms: 1,
        retry_backoff_factor: 2.0,
        timeout_secs: 5,
        ..HttpConfig::default()
    };
    let index_url = Url::parse(&server.uri()).unwrap();
    (HttpFetcher::from_config(&config, &index_url).unwrap(), index_url)
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Puri"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(4)
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Puri"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Puri</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let (fetcher, base) = fetcher(5, &server);
    let body = fetcher.fetch(&base.join("/wiki/Puri").unwrap()).await.unwrap();

    assert_eq!(body, b"<p>Puri</p>");
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Down"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let (fetcher, base) = fetcher(3, &server);
    let err = fetcher
        .fetch_with_retry(&base.join("/wiki/Down").unwrap())
        .await
        .unwrap_err();

    match err {
        FetchError::Unreachable { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(last, "HTTP 502");
        }
        other => panic!("expected Unreachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (fetcher, base) = fetcher(5, &server);
    let err = fetcher.fetch(&base.join("/wiki/Gone").unwrap()).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_backoff_waits_between_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpConfig {
        retry_max_attempts: 3,
        retry_backoff_base_ms: 40,
        retry_backoff_factor: 2.0,
        ..HttpConfig::default()
    };
    let base = Url::parse(&server.uri()).unwrap();
    let fetcher = HttpFetcher::from_config(&config, &base).unwrap();

    let started = Instant::now();
    let _ = fetcher.fetch(&base.join("/slow").unwrap()).await;

    // 40ms before the second attempt, 80ms before the third
    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn test_sends_browser_headers() {
    let server = MockServer::start().await;
    let referer = format!("{}/", server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("user-agent"))
        .and(header("referer", referer.as_str()))
        .and(header("pragma", "no-cache"))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let (fetcher, base) = fetcher(1, &server);
    let body = fetcher.fetch(&base).await.unwrap();

    assert_eq!(body, b"ok");
}
