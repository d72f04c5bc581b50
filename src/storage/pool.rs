//! # Database Connection Pool Management
//!
//! Provides SQLite connection pool creation and management utilities.

use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    validate_config(config)?;

    let pool_options = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    let pool_options = if let Some(idle_timeout) = config.idle_timeout() {
        pool_options.idle_timeout(idle_timeout)
    } else {
        pool_options
    };

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| Error::database(e, format!("Invalid SQLite connection string: {}", config.url)))?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = pool_options.connect_with(connect_options).await.map_err(|e| {
        tracing::error!(
            error = %e,
            url = %config.url,
            busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
            "Failed to create SQLite database pool"
        );
        Error::database(e, format!("Failed to connect to database: {}", config.url))
    })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_ms = config.connect_timeout().as_millis(),
        idle_timeout_ms = config.idle_timeout().map(|d| d.as_millis()),
        "Database connection pool created"
    );

    if config.auto_migrate {
        tracing::info!("Auto-migration enabled, running database migrations");
        crate::storage::migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// Validate database configuration
fn validate_config(config: &DatabaseConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(Error::validation("max_connections must be greater than 0"));
    }

    if config.min_connections > config.max_connections {
        return Err(Error::validation("min_connections cannot be greater than max_connections"));
    }

    if config.url.is_empty() {
        return Err(Error::validation("database URL cannot be empty"));
    }

    if !config.url.starts_with("sqlite:") {
        return Err(Error::validation("database URL must start with 'sqlite:'"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_valid() {
        let config = DatabaseConfig {
            url: "sqlite://./test.db".to_string(),
            max_connections: 10,
            min_connections: 2,
            ..Default::default()
        };

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_max_connections() {
        let config = DatabaseConfig {
            url: "sqlite://./test.db".to_string(),
            max_connections: 0,
            ..Default::default()
        };

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_min_max() {
        let config = DatabaseConfig {
            url: "sqlite://./test.db".to_string(),
            max_connections: 5,
            min_connections: 10,
            ..Default::default()
        };

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_empty_url() {
        let config = DatabaseConfig { url: "".to_string(), ..Default::default() };

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_url_scheme() {
        let config = DatabaseConfig { url: "mysql://localhost/test".to_string(), ..Default::default() };

        assert!(validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_create_pool_success() {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 3,
            min_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        crate::storage::check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_pool_invalid_config() {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 0,
            ..Default::default()
        };

        let result = create_pool(&config).await;
        assert!(result.is_err());
    }
}
