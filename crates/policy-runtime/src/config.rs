//! # Engine Configuration
//!
//! Runtime parameters of the policy engine. Every value has a default and
//! can be overridden from the environment.

use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::env;
use std::time::Duration;

/// Default deadline around one actor action, in milliseconds.
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline around one actor action and its event cascade.
    pub action_timeout: Duration,
    /// Events buffered per observer subscription before it lags.
    pub event_capacity: usize,
    /// Refuse to publish policies that fail validation.
    pub strict_publish: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            strict_publish: true,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PE_ACTION_TIMEOUT_MS`: action deadline (default: 30000)
    /// - `PE_EVENT_CAPACITY`: observer buffer size (default: 1000)
    /// - `PE_STRICT_PUBLISH`: refuse invalid policies (default: true)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            action_timeout: lookup("PE_ACTION_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.action_timeout),

            event_capacity: lookup("PE_EVENT_CAPACITY")
                .and_then(|v| v.trim().parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.event_capacity),

            strict_publish: lookup("PE_STRICT_PUBLISH")
                .map(|v| !v.eq_ignore_ascii_case("false") && v != "0")
                .unwrap_or(defaults.strict_publish),
        }
    }

    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.strict_publish = false;
        self
    }
}
