//! # Quantum-Vault Telemetry
//!
//! Structured logging for Quantum-Vault nodes, built on `tracing`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qv_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     tracing::info!("[qv-00] node starting");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `quantum-vault` | Service name attached to logs |
//! | `QV_NODE_ID` | `00` | Node identifier |
//! | `QV_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QV_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `QV_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

mod config;
mod logging;
mod subscriber;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global tracing subscriber described by `config`.
///
/// Returns a guard that should be held for the lifetime of the process.
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::init_subscriber(&config)?;

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "[qv-00] Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service: config.full_service_name(),
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service: String,
}

impl TelemetryGuard {
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "[qv-00] Shutting down telemetry");
    }
}
