//! Audit vocabulary shared by the recorder, the query surface and the
//! storage layer.
//!
//! Persisted `action` and `entity_type` values use the inventory product's
//! Portuguese terms; code identifiers stay English.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Fixed vocabulary of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuditAction {
    #[serde(rename = "criar")]
    Create,
    #[serde(rename = "editar")]
    Edit,
    #[serde(rename = "excluir")]
    Delete,
    #[serde(rename = "visualizar")]
    View,
    #[serde(rename = "exportar")]
    Export,
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "acessar")]
    Access,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "criar",
            AuditAction::Edit => "editar",
            AuditAction::Delete => "excluir",
            AuditAction::View => "visualizar",
            AuditAction::Export => "exportar",
            AuditAction::Download => "download",
            AuditAction::Access => "acessar",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AuditActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "criar" => Ok(AuditAction::Create),
            "editar" => Ok(AuditAction::Edit),
            "excluir" => Ok(AuditAction::Delete),
            "visualizar" => Ok(AuditAction::View),
            "exportar" => Ok(AuditAction::Export),
            "download" => Ok(AuditAction::Download),
            "acessar" => Ok(AuditAction::Access),
            other => Err(AuditActionParseError(other.to_string())),
        }
    }
}

/// Error returned when action parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid audit action: {0}")]
pub struct AuditActionParseError(pub String);

/// Access level tag supplied by the upstream authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AccessLevel {
    #[serde(rename = "operador")]
    Operator,
    #[serde(rename = "tecnico")]
    Technician,
    #[serde(rename = "administrador")]
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Operator => "operador",
            AccessLevel::Technician => "tecnico",
            AccessLevel::Admin => "administrador",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccessLevel::Admin)
    }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AccessLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operador" => Ok(AccessLevel::Operator),
            "tecnico" => Ok(AccessLevel::Technician),
            "administrador" => Ok(AccessLevel::Admin),
            other => Err(AccessLevelParseError(other.to_string())),
        }
    }
}

/// Error returned when access level parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid access level: {0}")]
pub struct AccessLevelParseError(pub String);

/// Entity-type names used in audit entries.
pub mod entity {
    pub const MAIL_ACCOUNT: &str = "email";
    pub const DEVICE: &str = "equipamento";
    pub const USER: &str = "usuario";
    pub const AUDIT_LOG: &str = "auditoria";
    pub const MASTER_KEY: &str = "chave_mestra";
    pub const COMPUTER: &str = "computador";
    pub const PRINTER: &str = "impressora";
    pub const IP_RANGE: &str = "faixa_ip";
    pub const TASK: &str = "tarefa";
}

/// Entity types whose actions are always classified as sensitive: they hold
/// secrets or personal data, or are the audit log's own read path.
const SENSITIVE_ENTITY_TYPES: &[&str] = &[
    entity::MAIL_ACCOUNT,
    entity::DEVICE,
    entity::USER,
    entity::AUDIT_LOG,
    entity::MASTER_KEY,
];

/// Classify an entity type for audit purposes.
pub fn is_sensitive_entity(entity_type: &str) -> bool {
    SENSITIVE_ENTITY_TYPES.contains(&entity_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Edit,
            AuditAction::Delete,
            AuditAction::View,
            AuditAction::Export,
            AuditAction::Download,
            AuditAction::Access,
        ] {
            let parsed: AuditAction = action.as_str().parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_action_parse_rejects_unknown() {
        assert!("destruir".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_action_serde_uses_persisted_vocabulary() {
        let json = serde_json::to_string(&AuditAction::Create).unwrap();
        assert_eq!(json, "\"criar\"");
    }

    #[test]
    fn test_access_level_roundtrip() {
        for level in [AccessLevel::Operator, AccessLevel::Technician, AccessLevel::Admin] {
            let parsed: AccessLevel = level.as_str().parse().unwrap();
            assert_eq!(level, parsed);
        }
        assert!(AccessLevel::Admin.is_admin());
        assert!(!AccessLevel::Operator.is_admin());
    }

    #[test]
    fn test_sensitivity_classification() {
        assert!(is_sensitive_entity(entity::MAIL_ACCOUNT));
        assert!(is_sensitive_entity(entity::DEVICE));
        assert!(is_sensitive_entity(entity::AUDIT_LOG));
        assert!(!is_sensitive_entity(entity::COMPUTER));
        assert!(!is_sensitive_entity(entity::PRINTER));
        assert!(!is_sensitive_entity("desconhecido"));
    }
}
