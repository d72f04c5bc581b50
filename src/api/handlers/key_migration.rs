//! Key migration administrative handler
//!
//! On-demand re-encryption of every stored secret under the current master
//! key. Admin only; the run itself is recorded as a sensitive audit
//! action, and the response is always a full accounting of what succeeded
//! and what did not.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    api::{error::ApiError, routes::ApiState},
    audit::{AuditEvent, RequestMeta},
    auth::{require_admin, AuthContext},
    domain::{entity, AuditAction},
    errors::Error,
    services::MigrationResult,
};

/// Request to re-encrypt every stored secret from an old master key
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyMigrationBody {
    /// Previous master key material (base64 key or passphrase)
    #[validate(length(min = 1))]
    pub old_key: String,
    /// Optional wall-clock budget; on expiry the run stops launching new
    /// record operations and returns the partial result
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for KeyMigrationBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMigrationBody")
            .field("old_key", &"[REDACTED]")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Run the master key migration
#[utoipa::path(
    post,
    path = "/api/v1/admin/key-migration",
    request_body = KeyMigrationBody,
    responses(
        (status = 200, description = "Migration accounting", body = MigrationResult),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Administrator access required")
    ),
    tag = "admin"
)]
#[instrument(skip(state, payload), fields(actor = %context.actor))]
pub async fn run_key_migration_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Json(payload): Json<KeyMigrationBody>,
) -> Result<Json<MigrationResult>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;
    require_admin(&context)?;

    let cancel = CancellationToken::new();
    if let Some(seconds) = payload.timeout_seconds {
        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
            timer.cancel();
        });
    }

    let result =
        state.key_migration.migrate(&payload.old_key, cancel).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Edit,
            entity::MASTER_KEY,
            format!(
                "Migração de chave executada: {} registros migrados, {} falhas",
                result.succeeded, result.failed
            ),
        ),
    );

    Ok(Json(result))
}
