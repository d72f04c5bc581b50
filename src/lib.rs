//! # Sentinela
//!
//! Sentinela is the credential protection and audit subsystem backing the
//! inventory management platform: it stores operator-entered secrets
//! (mail account and device passwords) encrypted at rest, decrypts them
//! only for authorized display, keeps an immutable and queryable trail of
//! every sensitive action, and re-encrypts every stored secret when the
//! master key changes.
//!
//! ## Architecture
//!
//! ```text
//! REST API Layer → Audit Recorder → Append-only Audit Log
//!      ↓                ↓
//! Credential Repositories → Secret Cipher (AES-256-GCM)
//!      ↓
//! Key Migration Service
//! ```
//!
//! ## Core Components
//!
//! - **Secret Cipher**: AES-256-GCM encryption of individual secrets with
//!   a process-wide master key derived once at startup
//! - **Redactor**: strips secret-bearing fields from entity snapshots
//!   before they reach the audit log
//! - **Audit Recorder**: fire-and-forget writes into the append-only log
//! - **Audit Query Service**: filterable, paginated reads plus streaming
//!   CSV export
//! - **Key Migration**: bounded-concurrency batch re-encryption with
//!   per-record failure accounting

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;

// Re-export commonly used types and traits
pub use errors::{Error, Result};
pub use observability::init_tracing;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "sentinela");
    }
}
