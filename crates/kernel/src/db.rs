//! Database connection pool management.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;
use crate::store::PgStore;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Connect and wrap the pool in a [`PgStore`] using the configured timeout.
pub async fn connect_store(config: &Config) -> Result<PgStore> {
    let pool = create_pool(config).await?;
    Ok(PgStore::new(pool, config.query_statement_timeout))
}
