//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! RetryExecutor asks for the next member
//!     → pool.rs (fixed, ordered members)
//!     → round_robin.rs (shared cursor, advanced once per selection)
//!     → Member (instance name + breaker/limiter wrapped endpoint)
//! ```
//!
//! # Design Decisions
//! - The pool is fixed after construction; there is no discovery
//! - Selection ignores breaker state; an open breaker fails fast and the
//!   retry executor simply moves on
//! - The algorithm is a trait so the pool does not care which one is used

pub mod pool;
pub mod round_robin;

use std::fmt::Debug;

pub use pool::{Member, Pool};
pub use round_robin::RoundRobin;

/// Selection algorithm over a pool of `len` members.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Index of the member to use next, or `None` for an empty pool.
    fn next_index(&self, len: usize) -> Option<usize>;
}
