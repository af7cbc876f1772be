//! Operation handlers.
//!
//! Bodies are parsed as JSON whatever the content type, so plain `curl -d`
//! works. Service errors travel in the `err` field of a 200 reply; only an
//! unreadable request is answered with 400.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::endpoint::{Reply, StringRequest};
use crate::http::server::AppState;

fn decode(body: &Bytes) -> Result<StringRequest, Response> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting malformed request body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "err": format!("invalid request: {}", e) })),
        )
            .into_response()
    })
}

pub async fn uppercase(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode(&body) {
        Ok(r) => r,
        Err(rejection) => return rejection,
    };
    Json(Reply::from_result(state.service.uppercase(request.s).await)).into_response()
}

pub async fn downcase(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode(&body) {
        Ok(r) => r,
        Err(rejection) => return rejection,
    };
    Json(Reply::from_result(state.service.downcase(request.s).await)).into_response()
}

pub async fn count(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode(&body) {
        Ok(r) => r,
        Err(rejection) => return rejection,
    };
    Json(Reply::ok(state.service.count(request.s).await)).into_response()
}

pub async fn palindrome(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode(&body) {
        Ok(r) => r,
        Err(rejection) => return rejection,
    };
    Json(Reply::from_result(state.service.palindrome(request.s).await)).into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
