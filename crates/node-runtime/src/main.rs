//! # Quantum-Vault Node
//!
//! The main entry point for a Quantum-Vault replication node.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`QV_LOG_LEVEL`, `QV_JSON_LOGS`)
//! 2. Load configuration from `QV_*` environment variables
//! 3. In production (`QV_PRODUCTION=1`), require an explicit network key
//!    (`QV_ENC_KEY` or `QV_NETWORK_PASSPHRASE`)
//! 4. Listen, dial bootstrap nodes, run until Ctrl+C

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use qv_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

fn production_mode() -> bool {
    std::env::var("QV_PRODUCTION")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("Failed to load node configuration")?;
    if production_mode() {
        config
            .validate_for_production()
            .context("Configuration not fit for production")?;
    }

    let runtime = NodeRuntime::new(config).context("Failed to wire node")?;
    runtime.start().await.context("Failed to start node")?;

    // Keep the node running
    info!("[qv-00] Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
