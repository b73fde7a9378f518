//! Bird Feeding API
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ──▶ telemetry middleware ──▶ handlers
//!                                          │                     │
//!                                          │            ┌────────┴────────┐
//!                                          │            ▼                 ▼
//!                                          │      feeding store    analysis service
//!                                          │                              │
//!                                          │                              ▼
//!                                          │                        task executor
//!                                          │               native ─▶ subprocess ─▶ simulation
//!                                          ▼
//!                                     event sink ──▶ collector / console
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use feeding_api::config::resolve_config;
use feeding_api::http::HttpServer;
use feeding_api::lifecycle::{build_state, shutdown_signal, Shutdown};
use feeding_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "feeding-api")]
#[command(about = "Bird feeding record service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// URL of a remote TOML configuration, tried when the file is absent
    #[arg(long)]
    remote_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let resolved = resolve_config(Some(&args.config), args.remote_config.as_deref()).await?;
    let (config, source) = (resolved.config, resolved.source);
    logging::init_logging(&config.telemetry);

    for fallback in &resolved.fallbacks {
        tracing::warn!(reason = %fallback, "Configuration source skipped");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        source = ?source,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let state = build_state(config)?;
    let store = state.store.clone();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(state);
    server.run(listener, shutdown_signal(shutdown.subscribe())).await?;

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to flush feeding store");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
