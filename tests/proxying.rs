//! End-to-end proxying tests: real HTTP between the service and mock peers.

use serde_json::json;
use stringsvc_proxy::config::ServiceConfig;

mod common;
use common::{call, hits, proxy_config, start_mock_backend, start_service, HitLog};

#[tokio::test]
async fn test_no_instances_serves_locally() {
    let (addr, shutdown) = start_service(ServiceConfig::default()).await;

    assert_eq!(call(addr, "uppercase", "hello").await, json!({ "v": "HELLO" }));
    assert_eq!(call(addr, "downcase", "HeLLo").await, json!({ "v": "hello" }));
    assert_eq!(
        call(addr, "uppercase", "").await,
        json!({ "v": "", "err": "empty string" })
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_healthy_instances_first_one_serves() {
    let log = HitLog::default();
    let a = start_mock_backend("a", &log, 200, r#"{"v":"FROM-A"}"#).await;
    let b = start_mock_backend("b", &log, 200, r#"{"v":"FROM-B"}"#).await;
    let c = start_mock_backend("c", &log, 200, r#"{"v":"FROM-C"}"#).await;
    let (addr, shutdown) = start_service(proxy_config(&[a, b, c])).await;

    assert_eq!(call(addr, "uppercase", "hello").await, json!({ "v": "FROM-A" }));
    assert_eq!(hits(&log), vec!["a"]);

    // Next call continues the rotation.
    assert_eq!(call(addr, "uppercase", "hello").await, json!({ "v": "FROM-B" }));
    assert_eq!(hits(&log), vec!["a", "b"]);

    shutdown.trigger();
}

#[tokio::test]
async fn test_failing_instances_are_tried_in_rotation() {
    let log = HitLog::default();
    let a = start_mock_backend("a", &log, 500, "boom").await;
    let b = start_mock_backend("b", &log, 503, "unavailable").await;
    let (addr, shutdown) = start_service(proxy_config(&[a, b])).await;

    let reply = call(addr, "uppercase", "hello").await;
    let err = reply["err"].as_str().unwrap();
    assert!(err.starts_with("retry exhausted after 3 attempt(s)"), "{}", err);
    assert!(err.contains("500"), "last failure should be a's: {}", err);
    assert_eq!(hits(&log), vec!["a", "b", "a"]);

    shutdown.trigger();
}

#[tokio::test]
async fn test_error_in_reply_body_is_retried() {
    let log = HitLog::default();
    let a = start_mock_backend("a", &log, 200, r#"{"v":"","err":"disk full"}"#).await;
    let b = start_mock_backend("b", &log, 200, r#"{"v":"HELLO"}"#).await;
    let (addr, shutdown) = start_service(proxy_config(&[a, b])).await;

    assert_eq!(call(addr, "downcase", "HELLO").await, json!({ "v": "HELLO" }));
    assert_eq!(hits(&log), vec!["a", "b"]);

    shutdown.trigger();
}

#[tokio::test]
async fn test_count_and_palindrome_stay_local() {
    let log = HitLog::default();
    let a = start_mock_backend("a", &log, 200, r#"{"v":"X"}"#).await;
    let (addr, shutdown) = start_service(proxy_config(&[a])).await;

    assert_eq!(call(addr, "count", "hello").await, json!({ "v": 5 }));
    assert_eq!(call(addr, "palindrome", "level").await, json!({ "v": true }));
    assert!(hits(&log).is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn test_empty_input_is_not_proxied() {
    let log = HitLog::default();
    let a = start_mock_backend("a", &log, 200, r#"{"v":"X"}"#).await;
    let (addr, shutdown) = start_service(proxy_config(&[a])).await;

    assert_eq!(
        call(addr, "uppercase", "").await,
        json!({ "v": "", "err": "empty string" })
    );
    assert!(hits(&log).is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn test_service_proxies_to_another_service() {
    let (upstream, upstream_shutdown) = start_service(ServiceConfig::default()).await;
    let (front, front_shutdown) = start_service(proxy_config(&[upstream])).await;

    assert_eq!(call(front, "uppercase", "chained").await, json!({ "v": "CHAINED" }));
    assert_eq!(call(front, "downcase", "CHAINED").await, json!({ "v": "chained" }));

    front_shutdown.trigger();
    upstream_shutdown.trigger();
}
