//! Bank webhook admission gateway.
//!
//! Accepts transaction-notification callbacks from the partner bank and
//! admits or rejects each request through a fixed chain of security gates.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │              WEBHOOK GATEWAY                 │
//!                      │                                              │
//!   Bank callback      │  ┌─────┐   ┌────────┐   ┌─────────────────┐ │
//!   ─────────────────────▶│ net │──▶│  http  │──▶│    pipeline     │ │
//!                      │  │ tls │   │ server │   │ ip → rate → sig │ │
//!                      │  └─────┘   └────────┘   └────────┬────────┘ │
//!                      │                                  │          │
//!                      │                                  ▼          │
//!   Uniform envelope   │  ┌──────────┐           ┌──────────────┐    │
//!   ◀─────────────────────│ response │◀──────────│   webhook    │    │
//!                      │  │ envelope │           │  processor   │    │
//!                      │  └──────────┘           └──────────────┘    │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐ │
//!                      │  │          Cross-Cutting Concerns        │ │
//!                      │  │  config (hot whitelist reload)         │ │
//!                      │  │  observability (tracing + Prometheus)  │ │
//!                      │  │  lifecycle (signals, graceful drain)   │ │
//!                      │  └────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhook_gateway::config::{self, GatewayConfig};
use webhook_gateway::lifecycle::{signals, Shutdown};
use webhook_gateway::observability::logging;
use webhook_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "webhook-gateway")]
#[command(about = "Admission gateway for bank transaction-notification webhooks", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(
        config.observability.log_json,
        &config.observability.log_filter,
    );

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        whitelist_entries = config.security.allowed_ips.len(),
        rate_limit = config.security.rate_limit_requests,
        "Gateway starting"
    );

    // Watch the config file for whitelist changes; without a file there is
    // nothing to watch and the update channel simply stays empty.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = config::ConfigWatcher::new(path);
            let handle = watcher.run()?;
            (updates, Some(handle))
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config.clone())?;

    if config.listener.tls.is_some() {
        let addr = config.listener.bind_address.parse()?;
        server.run_tls(addr, config_updates, shutdown_rx).await?;
    } else {
        let listener = TcpListener::bind(&config.listener.bind_address).await?;
        server.run(listener, config_updates, shutdown_rx).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
