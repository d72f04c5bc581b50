//! Mail account credential HTTP handlers
//!
//! CRUD over mail account credentials plus the authorized password reveal
//! path. List and get responses never include password material; the
//! reveal endpoint is restricted to administrators and audited. Every
//! mutation is audited with redacted before/after snapshots.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    api::{
        error::ApiError,
        handlers::pagination::PageQuery,
        routes::ApiState,
    },
    audit::{AuditEvent, RequestMeta},
    auth::{require_admin, AuthContext},
    domain::{entity, AuditAction, MailAccountId},
    errors::Error,
    storage::repositories::{CreateMailAccountRequest, MailAccountData, UpdateMailAccountRequest},
};

/// Request to register a mail account credential
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMailAccountBody {
    /// Mail address of the account
    #[validate(length(min = 1, max = 255))]
    pub account: String,
    /// Responsible person or sector
    pub owner: Option<String>,
    /// Account password (stored encrypted, returned only by the reveal path)
    #[validate(length(min = 1))]
    pub senha: String,
    pub notes: Option<String>,
}

/// Request to update a mail account credential
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMailAccountBody {
    pub owner: Option<String>,
    /// New password (optional; re-encrypted when present)
    #[validate(length(min = 1))]
    pub senha: Option<String>,
    pub notes: Option<String>,
}

/// Mail account metadata response (never includes password material)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MailAccountResponse {
    pub id: String,
    pub account: String,
    pub owner: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MailAccountResponse {
    pub fn from_data(data: &MailAccountData) -> Self {
        Self {
            id: data.id.to_string(),
            account: data.account.clone(),
            owner: data.owner.clone(),
            notes: data.notes.clone(),
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }
}

/// Decrypted password response for the authorized reveal path
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealedPasswordResponse {
    pub account: String,
    pub senha: String,
}

fn parse_id(raw: &str) -> Result<MailAccountId, ApiError> {
    MailAccountId::parse(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid mail account id: {}", raw)))
}

#[utoipa::path(
    post,
    path = "/api/v1/mail-accounts",
    request_body = CreateMailAccountBody,
    responses(
        (status = 201, description = "Mail account created", body = MailAccountResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Account already registered")
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state, payload), fields(account = %payload.account, actor = %context.actor))]
pub async fn create_mail_account_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Json(payload): Json<CreateMailAccountBody>,
) -> Result<(StatusCode, Json<MailAccountResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    // Snapshot of the operator input; the recorder redacts the password
    // before anything is persisted to the log.
    let after = serde_json::json!({
        "account": payload.account,
        "owner": payload.owner,
        "senha": payload.senha,
        "notes": payload.notes,
    });

    let request = CreateMailAccountRequest {
        account: payload.account,
        owner: payload.owner,
        password: payload.senha,
        notes: payload.notes,
    };

    let created = state.mail_accounts.create(request).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Create,
            entity::MAIL_ACCOUNT,
            format!("Conta de email '{}' criada", created.account),
        )
        .entity_id(created.id.as_str())
        .after(after),
    );

    Ok((StatusCode::CREATED, Json(MailAccountResponse::from_data(&created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/mail-accounts",
    params(PageQuery),
    responses(
        (status = 200, description = "List of mail accounts (metadata only)", body = [MailAccountResponse])
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state, page), fields(actor = %context.actor))]
pub async fn list_mail_accounts_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<MailAccountResponse>>, ApiError> {
    let (_, page_size) = page.clamp();
    let accounts =
        state.mail_accounts.list(page_size, page.offset()).await.map_err(ApiError::from)?;

    Ok(Json(accounts.iter().map(MailAccountResponse::from_data).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/mail-accounts/{id}",
    params(("id" = String, Path, description = "Mail account ID")),
    responses(
        (status = 200, description = "Mail account metadata", body = MailAccountResponse),
        (status = 404, description = "Mail account not found")
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state), fields(mail_account_id = %id, actor = %context.actor))]
pub async fn get_mail_account_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MailAccountResponse>, ApiError> {
    let id = parse_id(&id)?;
    let account = state.mail_accounts.get_by_id(&id).await.map_err(ApiError::from)?;

    Ok(Json(MailAccountResponse::from_data(&account)))
}

#[utoipa::path(
    put,
    path = "/api/v1/mail-accounts/{id}",
    params(("id" = String, Path, description = "Mail account ID")),
    request_body = UpdateMailAccountBody,
    responses(
        (status = 200, description = "Mail account updated", body = MailAccountResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Mail account not found")
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state, payload), fields(mail_account_id = %id, actor = %context.actor))]
pub async fn update_mail_account_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMailAccountBody>,
) -> Result<Json<MailAccountResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;
    let id = parse_id(&id)?;

    let existing = state.mail_accounts.get_by_id(&id).await.map_err(ApiError::from)?;
    let before = serde_json::to_value(&existing)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot mail account: {}", e)))?;

    let request = UpdateMailAccountRequest {
        owner: payload.owner,
        password: payload.senha.clone(),
        notes: payload.notes,
    };

    let updated = state.mail_accounts.update(&id, request).await.map_err(ApiError::from)?;

    let mut after = serde_json::to_value(&updated)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot mail account: {}", e)))?;
    if let Some(senha) = payload.senha {
        // Present in the operator input; the recorder strips it again
        after["senha"] = serde_json::Value::String(senha);
    }

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Edit,
            entity::MAIL_ACCOUNT,
            format!("Conta de email '{}' editada", updated.account),
        )
        .entity_id(id.as_str())
        .before(before)
        .after(after),
    );

    Ok(Json(MailAccountResponse::from_data(&updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/mail-accounts/{id}",
    params(("id" = String, Path, description = "Mail account ID")),
    responses(
        (status = 204, description = "Mail account deleted"),
        (status = 404, description = "Mail account not found")
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state), fields(mail_account_id = %id, actor = %context.actor))]
pub async fn delete_mail_account_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    let existing = state.mail_accounts.get_by_id(&id).await.map_err(ApiError::from)?;
    let before = serde_json::to_value(&existing)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot mail account: {}", e)))?;

    state.mail_accounts.delete(&id).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Delete,
            entity::MAIL_ACCOUNT,
            format!("Conta de email '{}' excluída", existing.account),
        )
        .entity_id(id.as_str())
        .before(before),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Reveal the decrypted password of a mail account
///
/// **Admin only.** A secret that cannot be decrypted yields an explicit
/// `decryption_failed` error, never a blank value or the raw ciphertext.
#[utoipa::path(
    get,
    path = "/api/v1/mail-accounts/{id}/password",
    params(("id" = String, Path, description = "Mail account ID")),
    responses(
        (status = 200, description = "Decrypted password", body = RevealedPasswordResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Mail account not found"),
        (status = 422, description = "Stored password cannot be decrypted with the current key")
    ),
    tag = "mail-accounts"
)]
#[instrument(skip(state), fields(mail_account_id = %id, actor = %context.actor))]
pub async fn reveal_mail_account_password_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
) -> Result<Json<RevealedPasswordResponse>, ApiError> {
    require_admin(&context)?;
    let id = parse_id(&id)?;

    let account = state.mail_accounts.get_by_id(&id).await.map_err(ApiError::from)?;
    let senha = state.mail_accounts.reveal_password(&id).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Access,
            entity::MAIL_ACCOUNT,
            format!("Senha da conta de email '{}' visualizada", account.account),
        )
        .entity_id(id.as_str()),
    );

    Ok(Json(RevealedPasswordResponse { account: account.account, senha }))
}
