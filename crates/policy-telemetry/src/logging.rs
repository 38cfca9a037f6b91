//! Structured logging setup.
//!
//! Every line carries the service name, level, target and the span fields
//! the engine records (`block_id`, `actor`, `event_type`, ...). Containers
//! get JSON, local runs get the human-readable format.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the log filter from `RUST_LOG` or the configured level.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(format!("log filter: {e}")))
}

/// Install the global subscriber.
///
/// Fails with [`TelemetryError::LoggingInit`] when a subscriber is already
/// installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let output = config.console_output.then(|| {
        if config.json_logs {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .boxed()
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Log an event of one block instance with the standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $block_type:expr, $block_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            block_type = %$block_type,
            block_id = %$block_id,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        let config = TelemetryConfig {
            log_level: "policy_runtime=debug,info".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_log_block_event_compiles_with_fields() {
        log_block_event!(debug, "mintDocumentBlock", "mint-1", "Block ran", amount = 3);
        log_block_event!(info, "sendToLedgerBlock", "send-1", "Block ran");
    }
}
