//! String service and its middleware layers.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → LoggingService (one event per call)
//!     → InstrumentingService (counters, latency)
//!     → ProxyingService (uppercase/downcase to remote instances)
//!     → LocalStringService (everything else)
//! ```
//!
//! # Design Decisions
//! - Every layer implements [`StringService`] and wraps an
//!   `Arc<dyn StringService>`, so the stack is assembled by composition
//! - A [`ServiceMiddleware`] is a one-shot function from the next layer to
//!   the wrapping one

pub mod instrumenting;
pub mod local;
pub mod logging;

use futures_util::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

use crate::endpoint::Failure;

pub use instrumenting::InstrumentingService;
pub use local::LocalStringService;
pub use logging::LoggingService;

/// Errors returned by string service operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The input string was empty.
    #[error("empty string")]
    Empty,

    /// A remote instance reported an error in its reply.
    #[error("{0}")]
    Remote(String),

    /// No instance could serve the call.
    #[error("{0}")]
    Unavailable(#[from] Failure),
}

impl ServiceError {
    /// Rebuild an error received in a reply body.
    pub fn from_wire(message: &str) -> Self {
        if message == ServiceError::Empty.to_string() {
            ServiceError::Empty
        } else {
            ServiceError::Remote(message.to_string())
        }
    }
}

/// Operations on strings.
pub trait StringService: Send + Sync {
    fn uppercase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>>;
    fn downcase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>>;
    fn count(&self, s: String) -> BoxFuture<'_, usize>;
    fn palindrome(&self, s: String) -> BoxFuture<'_, Result<bool, ServiceError>>;
}

/// A chainable behavior modifier for a [`StringService`].
pub type ServiceMiddleware =
    Box<dyn FnOnce(Arc<dyn StringService>) -> Arc<dyn StringService> + Send>;

/// Reject inputs no implementation accepts.
pub fn validate_input(s: &str) -> Result<(), ServiceError> {
    if s.is_empty() {
        return Err(ServiceError::Empty);
    }
    Ok(())
}
