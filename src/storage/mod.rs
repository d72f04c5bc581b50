//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for credential records
//! and the append-only audit log.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use migrations::{run_migrations, validate_migrations};
pub use pool::{create_pool, DbPool};
pub use repositories::{
    AuditLogEntry, AuditLogFilters, AuditLogRepository, CreateDeviceRequest,
    CreateMailAccountRequest, CredentialStore, DeviceData, DeviceRepository, MailAccountData,
    MailAccountRepository, NewAuditEntry, StoredCredential, UpdateDeviceRequest,
    UpdateMailAccountRequest,
};

use crate::errors::{Error, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::database(e, "Database connectivity check failed"))?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    /// In-memory SQLite pool with all migrations applied.
    ///
    /// Single connection so the in-memory database survives for the whole
    /// pool lifetime.
    pub async fn memory_pool() -> DbPool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("sqlite options");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("connect to in-memory sqlite");
        run_migrations(&pool).await.expect("apply migrations");
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_connectivity() {
        let pool = test_util::memory_pool().await;
        check_connection(&pool).await.unwrap();
    }
}
