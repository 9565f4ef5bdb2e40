pub mod models;
pub mod schema;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Get the shared connection pool, creating it lazily from DATABASE_URL.
pub async fn pool() -> Result<PgPool, DbError> {
    let pool = POOL.get_or_try_init(connect).await?;
    Ok(pool.clone())
}

async fn connect() -> Result<PgPool, DbError> {
    let dsn = connection_string()?;
    let cfg = &config::config().database;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.connection_timeout_secs))
        .connect(&dsn)
        .await?;

    info!("Created database pool");
    Ok(pool)
}

fn connection_string() -> Result<String, DbError> {
    let dsn =
        std::env::var("DATABASE_URL").map_err(|_| DbError::ConfigMissing("DATABASE_URL"))?;

    let url = url::Url::parse(&dsn).map_err(|_| DbError::InvalidDatabaseUrl)?;
    if url.scheme() != "postgres" && url.scheme() != "postgresql" {
        return Err(DbError::InvalidDatabaseUrl);
    }

    Ok(dsn)
}

/// Pings the pool to ensure connectivity
pub async fn health_check() -> Result<(), DbError> {
    let pool = pool().await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_postgres_urls() {
        std::env::set_var("DATABASE_URL", "mysql://localhost/revo");
        assert!(matches!(connection_string(), Err(DbError::InvalidDatabaseUrl)));
        std::env::set_var("DATABASE_URL", "postgresql://localhost/revo");
        assert!(connection_string().is_ok());
    }
}
