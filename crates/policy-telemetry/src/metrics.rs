//! Prometheus metrics for the policy engine.
//!
//! All metrics follow the naming convention: `pe_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: dispatched events, ledger submissions, minted units
//! - **Histogram**: duration of actor actions

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Event deliveries by event type and final delivery state
    pub static ref EVENTS_DISPATCHED: CounterVec = CounterVec::new(
        Opts::new("pe_dispatch_deliveries_total", "Event deliveries by outcome"),
        &["event_type", "status"]  // status: completed/failed/undeliverable
    ).expect("metric creation failed");

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Actor actions by block type and outcome
    pub static ref ACTIONS: CounterVec = CounterVec::new(
        Opts::new("pe_actions_total", "Actor actions by block type and outcome"),
        &["block_type", "outcome"]  // outcome: accepted/rejected/failed/timeout
    ).expect("metric creation failed");

    /// Action duration
    pub static ref ACTION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pe_action_duration_seconds",
            "Time from action entry to the end of its event cascade"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("bucket layout")),
        &["block_type"]
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER
    // =========================================================================

    /// Envelopes sent to the ledger
    pub static ref LEDGER_SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("pe_ledger_submissions_total", "Envelopes sent to a ledger topic"),
        &["result"]  // result: ok/error
    ).expect("metric creation failed");

    /// Units minted per token
    pub static ref TOKENS_MINTED: CounterVec = CounterVec::new(
        Opts::new("pe_ledger_tokens_minted_total", "On-ledger units minted"),
        &["token_id"]
    ).expect("metric creation failed");

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Errors reported by publish-time validation
    pub static ref VALIDATION_ERRORS: Counter = Counter::new(
        "pe_validation_errors_total",
        "Errors found while validating policies at publish time"
    ).expect("metric creation failed");
}

/// Handle on the registry the engine's metrics live in.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl std::fmt::Debug for MetricsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandle").finish_non_exhaustive()
    }
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error; engines created in the same process
/// share the registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_DISPATCHED.clone()),
        Box::new(ACTIONS.clone()),
        Box::new(ACTION_DURATION.clone()),
        Box::new(LEDGER_SUBMISSIONS.clone()),
        Box::new(TOKENS_MINTED.clone()),
        Box::new(VALIDATION_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

impl MetricsHandle {
    /// Encode all metrics as Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Timer guard observing the elapsed seconds on drop.
pub struct ActionTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl ActionTimer {
    pub fn start(block_type: &str) -> Self {
        Self {
            histogram: ACTION_DURATION.with_label_values(&[block_type]),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for ActionTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
