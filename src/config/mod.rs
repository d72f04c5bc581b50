//! # Configuration Management
//!
//! Environment-sourced configuration for the Sentinela service. Every
//! config struct is read once at process start and injected into the
//! components that need it.

pub mod settings;

pub use settings::{ApiServerConfig, DatabaseConfig, EncryptionConfig, ObservabilityConfig};
