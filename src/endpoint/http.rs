//! HTTP endpoint adapter.
//!
//! # Responsibilities
//! - Turn one configured instance address into a request URL (fail fast)
//! - Perform one JSON round-trip per call
//! - Map transport problems and in-body errors onto [`Failure`]
//!
//! # Design Decisions
//! - Addresses without a scheme are plain HTTP
//! - Addresses without a path get the operation's default route
//! - No retries and no timeouts here; the retry executor owns both

use axum::body::Body;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use url::Url;

use futures_util::future::{BoxFuture, FutureExt};

use super::wire::{Operation, WireResponse};
use super::{Endpoint, Failure};
use crate::config::ConfigError;

/// Replies larger than this are treated as transport errors.
const MAX_REPLY_BYTES: usize = 1024 * 1024;

/// Client type shared by every adapter of a process.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the pooled HTTP/1.1 client used by all adapters.
pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Resolve an instance address into the URL serving `operation`.
pub fn instance_url(instance: &str, operation: Operation) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidInstance {
        instance: instance.to_string(),
        reason,
    };

    let trimmed = instance.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty address".into()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(operation.path());
    }
    Ok(url)
}

/// One remote instance, exposed as an [`Endpoint`].
pub struct HttpEndpoint<Req, Resp> {
    instance: Arc<str>,
    uri: Uri,
    client: HttpClient,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> HttpEndpoint<Req, Resp> {
    /// Create an adapter for `instance`. Malformed addresses are rejected here,
    /// never at call time.
    pub fn new(instance: &str, operation: Operation, client: HttpClient) -> Result<Self, ConfigError> {
        let url = instance_url(instance, operation)?;
        let uri: Uri = url.as_str().parse().map_err(|e: axum::http::uri::InvalidUri| {
            ConfigError::InvalidInstance {
                instance: instance.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            instance: Arc::from(instance.trim()),
            uri,
            client,
            _marker: PhantomData,
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }
}

impl<Req, Resp> Endpoint<Req, Resp> for HttpEndpoint<Req, Resp>
where
    Req: Serialize + Send + 'static,
    Resp: DeserializeOwned + WireResponse + Send + 'static,
{
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, Failure>> {
        async move {
            let payload = serde_json::to_vec(&request)
                .map_err(|e| Failure::Transport(format!("encode request: {}", e)))?;

            let req = Request::builder()
                .method(Method::POST)
                .uri(self.uri.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .map_err(|e| Failure::Transport(e.to_string()))?;

            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| Failure::Transport(e.to_string()))?;

            let status = response.status();
            let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_REPLY_BYTES)
                .await
                .map_err(|e| Failure::Transport(format!("read reply: {}", e)))?;

            if !status.is_success() {
                return Err(Failure::Transport(format!("unexpected status {}", status)));
            }

            let reply: Resp = serde_json::from_slice(&bytes)
                .map_err(|e| Failure::Transport(format!("decode reply: {}", e)))?;

            if let Some(err) = reply.error() {
                return Err(Failure::Remote(err.to_string()));
            }
            Ok(reply)
        }
        .boxed()
    }
}
