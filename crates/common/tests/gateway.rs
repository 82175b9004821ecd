//! Integration tests for gateway reads against a mock HTTP gateway

mod common;

use std::time::Duration;

use ::common::gateway::{self, GatewayError, GatewayReader, ReadCache};
use ::common::linked_data::compute_cid;
use http::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_read_bytes_exact() {
    common::init_tracing();
    let server = MockServer::start().await;
    let body = [0u8, 159, 146, 150, 255];
    serve(&server, "/ipfs/binary", &body).await;

    let url = format!("{}/ipfs/binary", server.uri());
    let bytes = gateway::read_bytes(&url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(&bytes[..], &body);
}

#[tokio::test]
async fn test_read_json() {
    let server = MockServer::start().await;
    serve(&server, "/ipfs/doc", br#"{"title":"Test","n":5}"#).await;

    let url = format!("{}/ipfs/doc", server.uri());
    let value: serde_json::Value = gateway::read_json(&url, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(value, json!({"title": "Test", "n": 5}));
}

#[tokio::test]
async fn test_read_is_idempotent() {
    let server = MockServer::start().await;
    serve(&server, "/ipfs/same", b"same bytes").await;

    let reader = GatewayReader::new().unwrap();
    let url = format!("{}/ipfs/same", server.uri());
    let first = reader.read_bytes(&url).await.unwrap();
    let second = reader.read_bytes(&url).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/ipfs/slow", server.uri());
    let timeout = Duration::from_millis(50);
    let err = gateway::read_bytes(&url, timeout).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(t) if t == timeout));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_missing_content_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/ipfs/missing", server.uri());
    let err = gateway::read_bytes(&url, Duration::from_secs(5))
        .await
        .unwrap_err();
    match &err {
        GatewayError::Status(status, failed) => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(failed, &url);
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_forbidden_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let url = format!("{}/ipfs/nope", server.uri());
    let err = gateway::read_bytes(&url, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_non_json_is_decode_error() {
    let server = MockServer::start().await;
    serve(&server, "/ipfs/text", b"plain text, not json").await;

    let url = format!("{}/ipfs/text", server.uri());
    let err = gateway::read_json::<serde_json::Value>(&url, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_verified_read_detects_wrong_content() {
    let server = MockServer::start().await;
    let expected = compute_cid(b"the real thing");
    serve(&server, &format!("/ipfs/{expected}"), b"something else").await;

    let cache = ReadCache::default();
    let reader = GatewayReader::new().unwrap().with_cache(cache.clone());
    let base = format!("{}/ipfs/", server.uri());
    let err = reader.read_verified(&base, &expected).await.unwrap_err();
    match err {
        GatewayError::Integrity { expected: e, actual } => {
            assert_eq!(e, expected);
            assert_eq!(actual, compute_cid(b"something else"));
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
    // bad content is not left in the cache
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cache_serves_repeat_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/cached"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cached".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let reader = GatewayReader::new()
        .unwrap()
        .with_cache(ReadCache::new(Duration::from_secs(60)));
    let url = format!("{}/ipfs/cached", server.uri());
    for _ in 0..3 {
        assert_eq!(&reader.read_bytes(&url).await.unwrap()[..], b"cached");
    }
    // MockServer verifies the single request on drop
}

#[tokio::test]
async fn test_failed_reads_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let cache = ReadCache::default();
    let reader = GatewayReader::new().unwrap().with_cache(cache.clone());
    let url = format!("{}/ipfs/flaky", server.uri());
    assert!(reader.read_bytes(&url).await.unwrap_err().is_retryable());
    assert!(cache.is_empty());
}
