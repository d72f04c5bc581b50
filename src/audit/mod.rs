//! # Audit Trail
//!
//! Snapshot redaction and the audit recorder. The recorder is the single
//! write path into the append-only audit log; every snapshot passes
//! through the redactor before persistence.

pub mod recorder;
pub mod redactor;

pub use recorder::{AuditActor, AuditEvent, AuditRecorder, RequestMeta};
pub use redactor::redact;
