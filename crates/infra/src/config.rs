//! Configuration loading and representation.
//!
//! The engine's external configuration surface is deliberately small:
//! database connection parameters plus the row-lock acquisition bound.

use std::time::Duration;

/// Storage configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Connection pool size (`DATABASE_MAX_CONNECTIONS`, default 10).
    pub max_connections: u32,
    /// Upper bound on waiting for the per-item row lock
    /// (`LOCK_TIMEOUT_MS`, default 5000). Exceeding it surfaces as a
    /// transient `LockTimeout` and rolls the transaction back.
    pub lock_timeout: Duration,
}

impl StoreConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Load from process environment. Fails only when `DATABASE_URL` is
    /// missing; malformed numeric variables fall back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_MAX_CONNECTIONS);

        let lock_timeout = std::env::var("LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_LOCK_TIMEOUT);

        Ok(Self {
            database_url,
            max_connections,
            lock_timeout,
        })
    }

    /// Config for a known URL with default pool and lock bounds.
    pub fn for_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }
}
