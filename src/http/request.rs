//! Request identification.
//!
//! # Responsibilities
//! - Reuse the caller's `x-request-id` or generate a UUID v4
//! - Make the ID available to handlers and echo it on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing; the layer sits
//!   outside `TraceLayer` so the request span can record it

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Extract the request ID header, if present and printable.
pub fn request_id_of<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Middleware assigning a request ID to every request.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = request_id_of(&request)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
    }
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
