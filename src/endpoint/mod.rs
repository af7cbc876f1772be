//! Endpoint abstraction.
//!
//! # Data Flow
//! ```text
//! RetryExecutor
//!     → CircuitBreakerEndpoint (reject fast when open)
//!     → RateLimitedEndpoint (token bucket admission)
//!     → HttpEndpoint (one round-trip to one instance)
//! ```
//!
//! Every layer above implements the same [`Endpoint`] trait, so a pipeline is
//! assembled by plain composition at startup.
//!
//! # Design Decisions
//! - Futures are boxed so layers compose behind `Arc<dyn Endpoint>`
//! - Per-attempt failures are a closed enum; callers never see transport types

pub mod http;
pub mod wire;

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::resilience::timeouts;

pub use http::HttpEndpoint;
pub use wire::{Operation, Reply, StringRequest, WireResponse};

/// Outcome of a single attempt, or the terminal outcome of a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The instance's token bucket had no capacity.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The instance's circuit breaker rejected the call without touching it.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Connection, status or decoding problem talking to the instance.
    #[error("transport error: {0}")]
    Transport(String),

    /// The instance answered with an error indicator in the response body.
    #[error("remote error: {0}")]
    Remote(String),

    /// The attempt outlived the remaining retry budget.
    #[error("attempt timed out")]
    Timeout,

    /// The caller cancelled the call.
    #[error("call cancelled")]
    Cancelled,

    /// The pool had nothing to select.
    #[error("no endpoints available")]
    NoEndpoints,

    /// Attempts or time budget ran out; carries the most recent failure.
    #[error("retry exhausted after {attempts} attempt(s): {last}")]
    RetryExhausted { attempts: u32, last: Box<Failure> },
}

impl Failure {
    /// Whether a circuit breaker should count this as a failure of its instance.
    ///
    /// Open rejections are a symptom of earlier failures and cancellations say
    /// nothing about the backend, so neither is counted.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self,
            Failure::RateLimited | Failure::Transport(_) | Failure::Remote(_) | Failure::Timeout
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Failure::Cancelled)
    }

    /// The underlying failure, looking through `RetryExhausted`.
    pub fn root(&self) -> &Failure {
        match self {
            Failure::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::RateLimited => "rate_limited",
            Failure::CircuitOpen => "circuit_open",
            Failure::Transport(_) => "transport",
            Failure::Remote(_) => "remote",
            Failure::Timeout => "timeout",
            Failure::Cancelled => "cancelled",
            Failure::NoEndpoints => "no_endpoints",
            Failure::RetryExhausted { .. } => "retry_exhausted",
        }
    }
}

/// A uniform callable: `Request -> Response | Failure`.
pub trait Endpoint<Req, Resp>: Send + Sync {
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, Failure>>;

    /// Like [`Endpoint::call`], but fail with [`Failure::Timeout`] once
    /// `limit` elapses.
    ///
    /// Layers that account for failures override this so the deadline applies
    /// beneath them and an overrun is recorded like any other failure.
    fn call_within<'a>(
        &'a self,
        request: Req,
        limit: Option<Duration>,
    ) -> BoxFuture<'a, Result<Resp, Failure>>
    where
        Resp: 'a,
    {
        timeouts::bounded(self.call(request), limit).boxed()
    }
}

/// Shared, type-erased endpoint as stored in pools.
pub type SharedEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

/// Adapts an async closure into an [`Endpoint`].
pub struct FnEndpoint<F> {
    f: F,
}

/// Wrap `f` so it can sit anywhere an endpoint is expected.
pub fn endpoint_fn<F>(f: F) -> FnEndpoint<F> {
    FnEndpoint { f }
}

impl<Req, Resp, F, Fut> Endpoint<Req, Resp> for FnEndpoint<F>
where
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, Failure>> + Send + 'static,
{
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, Failure>> {
        (self.f)(request).boxed()
    }
}
