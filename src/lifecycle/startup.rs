//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble the service stack from validated configuration
//! - Build every proxy pipeline before traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Layer order is fixed: logging wraps instrumenting wraps proxying wraps
//!   the local implementation

use std::sync::Arc;

use crate::config::{ConfigError, ServiceConfig};
use crate::lifecycle::Shutdown;
use crate::proxy::proxying;
use crate::service::{
    InstrumentingService, LocalStringService, LoggingService, ServiceMiddleware, StringService,
};

/// Build the complete string service for `config`.
///
/// Proxied calls are cancelled when `shutdown` is triggered.
pub fn build_service(
    config: &ServiceConfig,
    shutdown: &Shutdown,
) -> Result<Arc<dyn StringService>, ConfigError> {
    let middlewares: Vec<ServiceMiddleware> = vec![
        proxying(config, shutdown.token())?,
        InstrumentingService::middleware(),
        LoggingService::middleware(),
    ];

    let local: Arc<dyn StringService> = Arc::new(LocalStringService::new());
    Ok(middlewares.into_iter().fold(local, |svc, mw| mw(svc)))
}
