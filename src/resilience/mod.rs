//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an operation:
//!     → retries.rs (attempt loop, time budget, cancellation)
//!     → load_balancer (next member)
//!     → circuit_breaker.rs (fail fast when open, count outcomes)
//!     → rate_limit.rs (token bucket admission)
//!     → endpoint (one round-trip)
//! ```
//!
//! # Design Decisions
//! - One breaker and one bucket per instance, owned by its pipeline
//! - Breaker and bucket checks are synchronous and never held across an await
//! - Per-attempt deadlines are opt-in (see timeouts.rs)

pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerEndpoint, CircuitState};
pub use rate_limit::{RateLimitedEndpoint, TokenBucket};
pub use retries::{RetryExecutor, RetryPolicy};
