//! Audit recorder
//!
//! Builds and persists one immutable audit entry per sensitive or notable
//! action. Snapshots pass through the redactor before they reach the
//! database. Business handlers use [`AuditRecorder::record_detached`]:
//! the write happens on a background task and a persistence failure goes
//! to the operational log only — it never aborts the business operation
//! that triggered it.

use crate::audit::redactor::redact;
use crate::auth::AuthContext;
use crate::domain::{is_sensitive_entity, AccessLevel, AuditAction};
use crate::errors::Result;
use crate::storage::repositories::{AuditLogRepository, NewAuditEntry};
use serde_json::Value;

/// Actor identity attached to every recorded entry.
#[derive(Debug, Clone)]
pub struct AuditActor {
    pub name: String,
    pub access_level: AccessLevel,
}

impl From<&AuthContext> for AuditActor {
    fn from(context: &AuthContext) -> Self {
        Self { name: context.actor.clone(), access_level: context.access_level }
    }
}

/// Request metadata attached to every recorded entry.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One auditable action, before classification and redaction.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity_type: &str, description: impl Into<String>) -> Self {
        Self {
            action,
            entity_type: entity_type.to_string(),
            entity_id: None,
            description: description.into(),
            before: None,
            after: None,
        }
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn before(mut self, snapshot: Value) -> Self {
        self.before = Some(snapshot);
        self
    }

    pub fn after(mut self, snapshot: Value) -> Self {
        self.after = Some(snapshot);
        self
    }
}

/// Single write path into the append-only audit log.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    repository: AuditLogRepository,
}

impl AuditRecorder {
    pub fn new(repository: AuditLogRepository) -> Self {
        Self { repository }
    }

    /// Classify, redact and persist one audit entry synchronously.
    pub async fn record(
        &self,
        actor: &AuditActor,
        meta: &RequestMeta,
        event: AuditEvent,
    ) -> Result<()> {
        let sensitive = is_sensitive_entity(&event.entity_type);

        let entry = NewAuditEntry {
            actor: actor.name.clone(),
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            description: event.description,
            before: event.before.as_ref().map(redact),
            after: event.after.as_ref().map(redact),
            client_ip: meta.client_ip.clone(),
            user_agent: meta.user_agent.clone(),
            access_level: actor.access_level,
            sensitive,
        };

        self.repository.append(entry).await?;
        Ok(())
    }

    /// Fire-and-forget variant for business handlers: the write runs on a
    /// background task, and failures are absorbed into the operational
    /// log. Callers get no error channel by design — losing an audit entry
    /// is preferable to blocking the primary feature.
    pub fn record_detached(&self, actor: AuditActor, meta: RequestMeta, event: AuditEvent) {
        let recorder = self.clone();
        let action = event.action;
        let entity_type = event.entity_type.clone();
        tokio::spawn(async move {
            if let Err(err) = recorder.record(&actor, &meta, event).await {
                tracing::error!(
                    error = %err,
                    action = %action,
                    entity_type = %entity_type,
                    "Failed to write audit entry"
                );
            }
        });
    }
}
