//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            CLI flags / STRINGSVC_PROXY
//!     → loader.rs (parse & deserialize)     │
//!     → overrides applied  ◀────────────────┘
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to startup, which builds the service stack once
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the instance set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Malformed instance addresses abort startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    split_instances, CircuitBreakerConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RateLimitConfig, RetryConfig, ServiceConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
