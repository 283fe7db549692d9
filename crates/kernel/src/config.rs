//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,

    /// Statement timeout for bag queries (default: 10 seconds).
    pub query_statement_timeout: Duration,

    /// Rows per page when no explicit limit is given (default: 20).
    pub page_size: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let timeout_secs: u64 = env::var("QUERY_STATEMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("QUERY_STATEMENT_TIMEOUT_SECS must be a valid u64")?;

        let page_size = env::var("SEMINARS_PAGE_SIZE")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("SEMINARS_PAGE_SIZE must be a valid u64")?;

        Ok(Self {
            database_url,
            database_max_connections,
            query_statement_timeout: Duration::from_secs(timeout_secs),
            page_size,
        })
    }
}
