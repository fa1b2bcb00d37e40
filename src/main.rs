//! Keep-warm agent.
//!
//! Wakes the backend, then keeps it from idling until interrupted.
//!
//! ```text
//!   load config → init logging/metrics → build ApiClient
//!        │
//!        ▼
//!   wake sequence (escalating pings)
//!        │
//!        ▼
//!   server monitor ──┐
//!   keep-alive ──────┼──▶ until SIGINT/SIGTERM → stop loops → exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use resilient_client::config::load_or_default;
use resilient_client::lifecycle::signals::shutdown_signal;
use resilient_client::observability::{logging, metrics};
use resilient_client::ApiClient;

#[derive(Parser)]
#[command(name = "resilient-client")]
#[command(about = "Keeps a cold-starting API backend awake", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "RESILIENT_CLIENT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("resilient-client v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let keep_alive = config.keep_alive.enabled;
    let monitoring = config.monitoring.enabled;
    let client = ApiClient::from_config(config)?;

    if client.wake_server_sequence().await {
        tracing::info!("Backend is awake");
    } else {
        tracing::warn!("Backend still unreachable; loops will keep probing");
    }

    if monitoring {
        client.start_server_monitoring();
    }
    if keep_alive {
        client.start_keep_alive();
    }

    shutdown_signal().await;

    client.shutdown();

    let status = client.server_status();
    tracing::info!(
        online = ?status.is_online,
        consecutive_failures = status.consecutive_failures,
        "Shutdown complete"
    );
    Ok(())
}
