//! # Configuration Settings
//!
//! Defines the configuration structures for the Sentinela service. All
//! values come from `SENTINELA_*` environment variables with sensible
//! defaults, except the master encryption key which has no default and
//! fails startup when absent.

use crate::errors::{Error, Result};
use std::time::Duration;

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

impl ApiServerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host =
            std::env::var("SENTINELA_API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SENTINELA_API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| Error::config(format!("Invalid API port: {}", e)))?;

        Ok(Self { host, port })
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,
    /// Enable automatic migrations on startup
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/sentinela.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("SENTINELA_DATABASE_URL").unwrap_or(defaults.url),
            max_connections: std::env::var("SENTINELA_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: defaults.min_connections,
            connect_timeout_seconds: defaults.connect_timeout_seconds,
            idle_timeout_seconds: defaults.idle_timeout_seconds,
            auto_migrate: std::env::var("SENTINELA_DATABASE_AUTO_MIGRATE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.auto_migrate),
        }
    }

    /// Whether the URL points at a SQLite database
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Master encryption key configuration.
///
/// The key material is either a base64-encoded 32-byte key or an arbitrary
/// operator passphrase that is hashed into key material at startup. Absence
/// is a fatal startup error for every path that touches encrypted secrets;
/// there is no fallback key.
#[derive(Clone)]
pub struct EncryptionConfig {
    /// Raw master key material
    pub master_key: String,
}

impl EncryptionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let master_key = std::env::var("SENTINELA_MASTER_KEY").map_err(|_| {
            Error::config(
                "SENTINELA_MASTER_KEY environment variable not set. \
                 Generate a key with: openssl rand -base64 32",
            )
        })?;

        if master_key.trim().is_empty() {
            return Err(Error::config("SENTINELA_MASTER_KEY must not be empty"));
        }

        Ok(Self { master_key })
    }
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig").field("master_key", &"[REDACTED]").finish()
    }
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log level filter directive (e.g. "info", "sentinela=debug")
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Service name used in log output
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "sentinela".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("SENTINELA_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: std::env::var("SENTINELA_LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
            service_name: defaults.service_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_database_defaults() {
        let config = DatabaseConfig::default();
        assert!(config.is_sqlite());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_idle_timeout_zero_is_none() {
        let config = DatabaseConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_encryption_config_debug_redacts_key() {
        let config = EncryptionConfig { master_key: "super-secret".to_string() };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
