//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// How long a caller waits for a contended account lock, in seconds
    pub lock_wait_secs: u64,

    /// Lease on an acquired account lock before it auto-expires, in seconds
    pub lock_lease_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let lock_wait_secs = env::var("LOCK_WAIT_SECS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOCK_WAIT_SECS"))?;

        let lock_lease_secs = env::var("LOCK_LEASE_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOCK_LEASE_SECS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            lock_wait_secs,
            lock_lease_secs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_wait_secs)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_secs)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
