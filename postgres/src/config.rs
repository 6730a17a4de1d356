//! Connection settings for the `PostgreSQL` backend.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable missing
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Variable present but unparseable
    #[error("Failed to parse {name}: {value}")]
    Parse {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
    },
}

/// Pool settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Connection string
    pub database_url: String,
    /// Pool size
    pub max_connections: u32,
    /// How long `begin` may wait for a free connection
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    /// Settings for `database_url` with default pool sizing.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Load from `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and
    /// `DATABASE_ACQUIRE_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvVarNotSet`] without `DATABASE_URL`, and
    /// [`ConfigError::Parse`] for a malformed numeric variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::EnvVarNotSet("DATABASE_URL".to_string()))?;
        let mut config = Self::new(database_url);

        if let Some(max) = parse_var::<u32>("DATABASE_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_var::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Open a pool with these settings.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Parse {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_explicit_url() {
        let config = PostgresConfig::new("postgres://localhost/booking");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }
}
