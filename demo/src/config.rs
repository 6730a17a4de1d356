//! Demo configuration from the environment.

use airline_booking_postgres::{ConfigError, PostgresConfig};
use airline_booking_runtime::EngineConfig;
use chrono::{DateTime, Duration, Utc};
use std::env;

/// Settings for one demo run.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Engine settings (`BOOKING_*` variables)
    pub engine: EngineConfig,
    /// `PostgreSQL` settings when `DATABASE_URL` is set; in-memory otherwise
    pub postgres: Option<PostgresConfig>,
    /// Days between now and the scheduled departure
    pub days_ahead: i64,
    /// Print the Prometheus exposition after the report
    pub print_metrics: bool,
}

impl DemoConfig {
    /// Load from `BOOKING_*`, `DATABASE_*`, `DEMO_DAYS_AHEAD` (30) and
    /// `DEMO_PRINT_METRICS` (true).
    ///
    /// # Errors
    ///
    /// Returns error if a `DATABASE_*` variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let postgres = if env::var_os("DATABASE_URL").is_some() {
            Some(PostgresConfig::from_env()?)
        } else {
            None
        };

        Ok(Self {
            engine: EngineConfig::from_env(),
            postgres,
            days_ahead: env::var("DEMO_DAYS_AHEAD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            print_metrics: env::var("DEMO_PRINT_METRICS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        })
    }

    /// Departure day for the scenario's flights, relative to `now`.
    pub fn departure_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.days_ahead)
    }
}
