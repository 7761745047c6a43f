//! Database connection pool management.

use super::DbError;
use sqlx::{Pool, Postgres, Sqlite};
use std::time::Duration;
use tracing::info;

/// Unified database pool that can work with SQLite or PostgreSQL.
pub enum DbPool {
    /// SQLite connection pool (for development/testing).
    Sqlite(Pool<Sqlite>),
    /// PostgreSQL connection pool (for production).
    Postgres(Pool<Postgres>),
}

/// Options for creating a database connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Maximum time to wait for a connection.
    pub acquire_timeout: Duration,
    /// Maximum lifetime of a connection.
    pub max_lifetime: Option<Duration>,
    /// Idle timeout for connections.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);

        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2);

        let acquire_timeout_secs = std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
            idle_timeout: Some(Duration::from_secs(600)),  // 10 minutes
        }
    }
}

impl PoolOptions {
    /// Options for a single-connection in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` opens its own database, so the
    /// pool is pinned to one connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
        }
    }
}

/// Creates a database connection pool from a database URL.
///
/// The URL scheme determines the database type:
/// - `sqlite://` or `sqlite:` for SQLite
/// - `postgres://` or `postgresql://` for PostgreSQL
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    let options = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
        PoolOptions::in_memory()
    } else {
        PoolOptions::default()
    };
    create_pool_with_options(database_url, options).await
}

/// Creates a database connection pool with custom options.
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, DbError> {
    if database_url.starts_with("sqlite:") {
        info!("Creating SQLite connection pool");
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .max_lifetime(options.max_lifetime)
            .idle_timeout(options.idle_timeout)
            .connect(database_url)
            .await?;
        Ok(DbPool::Sqlite(pool))
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Creating PostgreSQL connection pool");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .max_lifetime(options.max_lifetime)
            .idle_timeout(options.idle_timeout)
            .connect(database_url)
            .await?;
        Ok(DbPool::Postgres(pool))
    } else {
        Err(DbError::Configuration(format!(
            "Unsupported database URL scheme. Expected sqlite:// or postgres://, got: {}",
            database_url.split(':').next().unwrap_or("unknown")
        )))
    }
}

impl Clone for DbPool {
    fn clone(&self) -> Self {
        match self {
            DbPool::Sqlite(pool) => DbPool::Sqlite(pool.clone()),
            DbPool::Postgres(pool) => DbPool::Postgres(pool.clone()),
        }
    }
}

impl DbPool {
    /// Returns the database type as a string.
    pub fn db_type(&self) -> &'static str {
        match self {
            DbPool::Sqlite(_) => "sqlite",
            DbPool::Postgres(_) => "postgres",
        }
    }

    /// Checks if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        match self {
            DbPool::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
        }
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::Sqlite(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
        }
    }

    /// Returns pool statistics.
    pub fn pool_size(&self) -> u32 {
        match self {
            DbPool::Sqlite(pool) => pool.size(),
            DbPool::Postgres(pool) => pool.size(),
        }
    }

    /// Returns number of idle connections.
    pub fn idle_connections(&self) -> usize {
        match self {
            DbPool::Sqlite(pool) => pool.num_idle(),
            DbPool::Postgres(pool) => pool.num_idle(),
        }
    }
}
