//! # Services
//!
//! Business logic that coordinates the crypto layer and the repositories.

pub mod key_migration;

pub use key_migration::{KeyMigrationService, MigrationFailure, MigrationResult};
