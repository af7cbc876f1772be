//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{body::Bytes, http::StatusCode, Router};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use stringsvc_proxy::config::ServiceConfig;
use stringsvc_proxy::lifecycle::{build_service, Shutdown};
use stringsvc_proxy::HttpServer;

/// Order in which mock backends were hit, by name.
pub type HitLog = Arc<Mutex<Vec<&'static str>>>;

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request's `s` field and returns the status and raw body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let f = Arc::new(f);
    let handler = move |body: Bytes| {
        let f = f.clone();
        async move {
            let s = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("s").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_default();
            let (status, body) = f(s).await;
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )
        }
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(handler);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a mock backend that records hits under `name` and always answers
/// with `status` and `body`.
pub async fn start_mock_backend(
    name: &'static str,
    log: &HitLog,
    status: u16,
    body: &'static str,
) -> SocketAddr {
    let log = log.clone();
    start_programmable_backend(move |_s| {
        log.lock().unwrap().push(name);
        async move { (status, body.to_string()) }
    })
    .await
}

/// Start the full service for `config` on an ephemeral port.
pub async fn start_service(mut config: ServiceConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let service = build_service(&config, &shutdown).unwrap();
    let server = HttpServer::new(&config, service, None);
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Config proxying to `instances`.
pub fn proxy_config(instances: &[SocketAddr]) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.proxy.instances = instances.iter().map(ToString::to_string).collect();
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// POST `{"s": s}` to `/<op>` and return the decoded reply.
pub async fn call(addr: SocketAddr, op: &str, s: &str) -> Value {
    let res = client()
        .post(format!("http://{}/{}", addr, op))
        .json(&serde_json::json!({ "s": s }))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 200, "unexpected status for /{}", op);
    res.json().await.unwrap()
}

pub fn hits(log: &HitLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}
