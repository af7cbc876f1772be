//! String service (v1)
//!
//! Serves uppercase, downcase, count and palindrome over HTTP, optionally
//! proxying the case operations to peer instances.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ─▶ logging ─▶ instrumenting ─▶ proxying ─┬─▶ local service
//!                                                                         │   (count, palindrome,
//!                                                                         │    or no instances)
//!                                                                         ▼
//!                                                   retry executor (attempts, time budget)
//!                                                                         │
//!                                                          round robin over instances
//!                                                                         │
//!                                                 per instance: breaker ─▶ token bucket ─▶ HTTP
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use stringsvc_proxy::config::{loader, split_instances, validate_config, ConfigError, ServiceConfig};
use stringsvc_proxy::lifecycle::{build_service, signals, Shutdown};
use stringsvc_proxy::observability::{logging, metrics};
use stringsvc_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "stringsvc-proxy", version, about = "String service with proxying middleware")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration.
    #[arg(short, long)]
    listen: Option<String>,

    /// Comma-separated instances to proxy uppercase and downcase to.
    #[arg(short, long)]
    proxy: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn load(args: &Args) -> Result<ServiceConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => {
            let mut config = ServiceConfig::default();
            loader::apply_env_overrides(&mut config);
            config
        }
    };

    if let Some(listen) = &args.listen {
        config.listener.bind_address = listen.clone();
    }
    if let Some(proxy) = &args.proxy {
        config.proxy.instances = split_instances(proxy);
    }
    if let Some(level) = &args.log_level {
        config.observability.log_level = level.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    logging::init(&config.observability);
    tracing::info!("stringsvc-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        source = %args
            .config
            .as_deref()
            .map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
        log_level = %config.observability.log_level,
        instances = config.proxy.instances.len(),
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let service = build_service(&config, &shutdown)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        instances = config.proxy.instances.len(),
        "Listening for connections"
    );

    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(&config, service, metrics_handle);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
