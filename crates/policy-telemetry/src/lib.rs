//! # Policy Telemetry
//!
//! Logging and metrics for the policy engine.
//!
//! ## Components
//!
//! - Structured logs through `tracing`, JSON in containers
//! - Prometheus counters and histograms in a process-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use policy_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _telemetry = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PE_SERVICE_NAME` | `policy-engine` | Service name in logs |
//! | `PE_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `PE_JSON_LOGS` | `false` | JSON log lines (default `true` in containers) |
//! | `PE_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    register_metrics, ActionTimer, MetricsHandle, ACTIONS, ACTION_DURATION, EVENTS_DISPATCHED,
    LEDGER_SUBMISSIONS, TOKENS_MINTED, VALIDATION_ERRORS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the log subscriber.
///
/// The returned handle renders the metrics; logging stays installed for the
/// life of the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<MetricsHandle, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;
    Ok(metrics)
}
