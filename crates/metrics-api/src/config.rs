//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Metrics API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Max events per aggregator feed fetch.
    pub batch_size: i64,
    /// Aggregator idle poll interval.
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CADENCE_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:cadence.db?mode=rwc` |
    /// | `CADENCE_BATCH_SIZE` | Aggregator batch size | `500` |
    /// | `CADENCE_POLL_INTERVAL_MS` | Aggregator idle poll interval | `200` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("CADENCE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:cadence.db?mode=rwc".to_string());

        let batch_size = match env::var("CADENCE_BATCH_SIZE") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidBatchSize)?,
            Err(_) => 500,
        };

        let poll_interval = match env::var("CADENCE_POLL_INTERVAL_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::InvalidPollInterval)?,
            Err(_) => Duration::from_millis(200),
        };

        Ok(Self {
            addr,
            database_url,
            batch_size,
            poll_interval,
        })
    }
}

/// Configuration errors. These prevent startup; they never occur mid-run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid CADENCE_ADDR format")]
    InvalidAddr,

    #[error("CADENCE_BATCH_SIZE must be a positive integer")]
    InvalidBatchSize,

    #[error("CADENCE_POLL_INTERVAL_MS must be a positive integer")]
    InvalidPollInterval,
}
