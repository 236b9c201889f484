//! Resilient string service (v1)
//!
//! Serves string operations over HTTP and, when remote instances are
//! configured, proxies greetings to them through a fault-tolerant pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum, request id, trace, timeout)
//!                  │
//!                  ▼
//!               service stack: instrument → logging → proxy → local
//!                                                     │
//!                                                     ▼ hello
//!               retry orchestrator ──▶ round robin ──▶ instance
//!                                                       │
//!                                   rate limiter → circuit breaker → HTTP GET
//!                                                       │
//!                                                       ▼
//!                                              remote instance /strings/greetings
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use resilient_proxy::config::{load_config, load_dotenv, load_from_env};
use resilient_proxy::http::HttpServer;
use resilient_proxy::lifecycle::{wait_for_signal, Shutdown};
use resilient_proxy::observability::{logging, metrics};
use resilient_proxy::service::{
    make_proxy, InstrumentedStringService, LocalStringService, LoggingStringService,
    SharedStringService,
};

#[derive(Parser)]
#[command(name = "resilient-proxy")]
#[command(about = "String service with a resilient remote-call proxy", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults and environment apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let dotenv_file = load_dotenv();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("resilient-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &dotenv_file {
        tracing::info!(path = %path.display(), "Environment file loaded");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        name = %config.service.name,
        instances = config.service.instances.as_deref().unwrap_or(""),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeouts.remote_call_ms))
        .build()?;

    let mut service: SharedStringService = Arc::new(LocalStringService::new(config.service.name.clone()));
    service = make_proxy(
        config.service.instances.as_deref(),
        &config.resilience,
        client,
        service,
    )?;
    service = Arc::new(LoggingStringService::new(service));
    service = Arc::new(InstrumentedStringService::new(service));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    HttpServer::new(&config, service)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
