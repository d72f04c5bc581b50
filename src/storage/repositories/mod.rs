//! Repository modules for data access
//!
//! Each repository handles persistence for one resource type. The
//! credential repositories additionally implement [`CredentialStore`], the
//! seam consumed by the key migration service.

pub mod audit_log;
pub mod device;
pub mod mail_account;

pub use audit_log::{AuditLogEntry, AuditLogFilters, AuditLogRepository, NewAuditEntry};
pub use device::{CreateDeviceRequest, DeviceData, DeviceRepository, UpdateDeviceRequest};
pub use mail_account::{
    CreateMailAccountRequest, MailAccountData, MailAccountRepository, UpdateMailAccountRequest,
};

use crate::errors::Result;

/// One encrypted credential record as seen by the key migration job.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    /// Record identifier (UUID string)
    pub id: String,
    /// Human-readable label for diagnostics (account address, device name)
    pub label: String,
    /// Encrypted password blob (`nonceHex:cipherHex`)
    pub ciphertext: String,
}

/// Read/write access to the ciphertext of every record in one
/// secret-bearing entity type. The blob is opaque here; only the cipher
/// layer interprets it.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Audit entity-type name for this store
    fn entity_type(&self) -> &'static str;

    /// All credential records, in stable creation order
    async fn list_credentials(&self) -> Result<Vec<StoredCredential>>;

    /// Replace the stored ciphertext of one record, identified by its id
    async fn update_ciphertext(&self, id: &str, ciphertext: &str) -> Result<()>;
}
