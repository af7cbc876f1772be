//! Proxying subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceConfig.proxy.instances
//!     → middleware.rs (one dispatcher per proxied operation)
//!     → dispatcher.rs (pipeline assembly, or passthrough when empty)
//!     → resilience + load_balancer + endpoint
//! ```
//!
//! # Design Decisions
//! - Each operation gets its own breakers and buckets; a trip on `uppercase`
//!   does not affect `downcase`
//! - Everything is built once at startup; nothing is discovered at runtime

pub mod dispatcher;
pub mod middleware;

pub use dispatcher::{build_executor, Dispatcher, ResilienceSettings};
pub use middleware::{proxying, ProxyingService};
