//! Live-server tests for `Fetcher::fetch_text` against a mock HTTP server:
//! circuit breaker lifecycle, retryable vs. non-retryable status handling,
//! and 429 backoff.

use std::time::Duration;

use krant_config::CircuitConfig;
use krant_fetch::{Fetcher, RetryConfig};
use krant_reliability::{CircuitBreaker, CircuitState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn circuit_opens_after_threshold_then_fails_fast() {
    let breaker = CircuitBreaker::new("test", CircuitConfig { failure_threshold: 2, open_duration_seconds: 300 });
    let fetcher = Fetcher::new(RetryConfig { max_attempts: 1, ..RetryConfig::default() }).unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/fail", mock_server.uri());

    assert!(fetcher.fetch_text(&url, &breaker).await.is_err());
    assert_eq!(breaker.state().await, CircuitState::Closed);

    assert!(fetcher.fetch_text(&url, &breaker).await.is_err());
    assert_eq!(breaker.state().await, CircuitState::Open);

    // Third call must fail fast without hitting the server again — the
    // mock's `expect(2)` would otherwise be violated on drop.
    let start = std::time::Instant::now();
    assert!(fetcher.fetch_text(&url, &breaker).await.is_err());
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn retryable_failures_eventually_succeed() {
    let breaker = CircuitBreaker::new("retry", CircuitConfig::default());
    let fetcher = Fetcher::new(RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        rate_limit_multiplier: 3.0,
    })
    .unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/retry"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/retry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/retry", mock_server.uri());
    let text = fetcher.fetch_text(&url, &breaker).await.unwrap();
    assert_eq!(text, "recovered");
}

#[tokio::test]
async fn non_retryable_status_fails_without_retrying() {
    let breaker = CircuitBreaker::new("not-found", CircuitConfig::default());
    let fetcher = Fetcher::new(RetryConfig { max_attempts: 3, ..RetryConfig::default() }).unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    assert!(fetcher.fetch_text(&url, &breaker).await.is_err());
}

#[tokio::test]
async fn rate_limited_response_is_retried() {
    let breaker = CircuitBreaker::new("rate-limited", CircuitConfig::default());
    let fetcher = Fetcher::new(RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        rate_limit_multiplier: 1.0,
    })
    .unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/throttled", mock_server.uri());
    let text = fetcher.fetch_text(&url, &breaker).await.unwrap();
    assert_eq!(text, "ok");
}
