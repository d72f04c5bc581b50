//! # Observability Infrastructure
//!
//! Structured logging for the Sentinela service via the tracing ecosystem.
//! Initialized once at startup; handlers and repositories annotate their
//! entry points with `#[instrument]` spans.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber from configuration.
///
/// Honors `RUST_LOG` when set, falling back to the configured level.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing() {
        let config = ObservabilityConfig::default();
        // May fail if another test already installed a subscriber; both
        // outcomes are acceptable here.
        let result = init_tracing(&config);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_invalid_log_level_is_config_error() {
        // An unparsable directive must not fall back to a default filter
        std::env::remove_var("RUST_LOG");
        let config = ObservabilityConfig {
            log_level: "sentinela=notalevel".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_tracing(&config), Err(Error::Config(_))));
    }
}
