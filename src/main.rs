//! consulize: Consul registration sidecar.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                  CONSULIZE                    │
//!   Client / probe   │  ┌─────────┐   ┌─────────────┐   ┌──────────┐ │
//!   ─────────────────┼─▶│   net   │──▶│   health    │──▶│ dispatch │─┼──▶ Backend
//!                    │  │listener │   │ interceptor │   │ http/ws  │ │
//!                    │  └─────────┘   └─────────────┘   └──────────┘ │
//!                    │                                                │
//!                    │  ┌──────────────────────────────────────────┐ │
//!                    │  │ lifecycle orchestrator                   │ │
//!                    │  │ bind → register → run → deregister →     │─┼──▶ Consul agent
//!                    │  │ drain → close                            │ │
//!                    │  └──────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! Exit codes: `0` clean shutdown, `1` startup failure, `2` listener close failure.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use consulize::config::{load_config, SidecarConfig};
use consulize::lifecycle::{signals, Orchestrator, Shutdown};
use consulize::observability::{logging, metrics};
use consulize::registry::ConsulClient;

#[derive(Parser)]
#[command(name = "consulize")]
#[command(version, about = "Registers a backend in Consul and proxies traffic to it", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => load_config(path),
        None => Ok(SidecarConfig::default()),
    };

    let config = match file_config {
        Ok(config) => config.from_env(),
        Err(e) => {
            logging::init(&SidecarConfig::default().observability);
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = consulize::VERSION, "consulize starting");

    if let Some(raw) = &config.observability.metrics_address {
        match raw.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %raw, "Failed to parse metrics address"),
        }
    }

    let registry = match ConsulClient::new(&config.registry) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build registry client");
            std::process::exit(1);
        }
    };

    let shutdown = Shutdown::new();
    signals::listen(shutdown.clone());

    let outcome = Orchestrator::new(config, registry, shutdown.subscribe()).run().await;

    let code = outcome.exit_code();
    tracing::info!(final_state = %outcome.final_state, exit_code = code, "Shutdown complete");
    std::process::exit(code);
}
