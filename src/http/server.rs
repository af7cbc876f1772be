//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::request::{assign_request_id, request_id_of};
use crate::lifecycle::Shutdown;
use crate::service::StringService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn StringService>,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the string service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around a fully assembled service.
    pub fn new(
        config: &ServiceConfig,
        service: Arc<dyn StringService>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState { service, metrics };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route("/uppercase", get(handlers::uppercase).post(handlers::uppercase))
            .route("/downcase", get(handlers::downcase).post(handlers::downcase))
            .route("/count", get(handlers::count).post(handlers::count))
            .route("/palindrome", get(handlers::palindrome).post(handlers::palindrome))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = request_id_of(request).unwrap_or("unknown"),
                )
            }))
            .layer(middleware::from_fn(assign_request_id))
    }

    /// Run the server until `shutdown` is triggered, then drain.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving with a custom listener setup.
    pub fn into_router(self) -> Router {
        self.router
    }
}
