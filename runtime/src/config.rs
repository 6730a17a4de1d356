//! Engine configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::retry::RetryPolicy;
use airline_booking_core::schedule::MAX_DAILY_FLIGHTS;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Booking engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Daily flight cap per airline, route and local day
    pub max_daily_flights: u32,
    /// Return a deleted booking's seats to inventory
    pub restock_on_booking_delete: bool,
    /// Retries after a concurrency conflict
    pub conflict_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_daily_flights: MAX_DAILY_FLIGHTS,
            restock_on_booking_delete: true,
            conflict_retries: 1,
            retry_initial_delay_ms: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BOOKING_MAX_DAILY_FLIGHTS` | 3 |
    /// | `BOOKING_RESTOCK_ON_DELETE` | true |
    /// | `BOOKING_CONFLICT_RETRIES` | 1 |
    /// | `BOOKING_RETRY_DELAY_MS` | 5 |
    ///
    /// Unset or unparsable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_daily_flights: env::var("BOOKING_MAX_DAILY_FLIGHTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_daily_flights),
            restock_on_booking_delete: env::var("BOOKING_RESTOCK_ON_DELETE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.restock_on_booking_delete),
            conflict_retries: env::var("BOOKING_CONFLICT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.conflict_retries),
            retry_initial_delay_ms: env::var("BOOKING_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_initial_delay_ms),
        }
    }

    /// Conflict retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.conflict_retries)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .build()
    }
}
