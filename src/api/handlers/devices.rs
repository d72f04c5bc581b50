//! Device credential HTTP handlers
//!
//! Same contract as the mail account handlers for password-bearing
//! inventory devices.

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
    api::{error::ApiError, handlers::pagination::PageQuery, routes::ApiState},
    audit::{AuditEvent, RequestMeta},
    auth::{require_admin, AuthContext},
    domain::{entity, AuditAction, DeviceId, DeviceKind},
    errors::Error,
    storage::repositories::{CreateDeviceRequest, DeviceData, UpdateDeviceRequest},
};

/// Request to register a device credential
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceBody {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Device kind: "servidor", "impressora" or "ativo_rede"
    pub kind: DeviceKind,
    pub location: Option<String>,
    /// Device password (stored encrypted, returned only by the reveal path)
    #[validate(length(min = 1))]
    pub senha: String,
    pub notes: Option<String>,
}

/// Request to update a device credential
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceBody {
    pub kind: Option<DeviceKind>,
    pub location: Option<String>,
    /// New password (optional; re-encrypted when present)
    #[validate(length(min = 1))]
    pub senha: Option<String>,
    pub notes: Option<String>,
}

/// Device metadata response (never includes password material)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceResponse {
    pub fn from_data(data: &DeviceData) -> Self {
        Self {
            id: data.id.to_string(),
            name: data.name.clone(),
            kind: data.kind,
            location: data.location.clone(),
            notes: data.notes.clone(),
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }
}

/// Decrypted password response for the authorized reveal path
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealedDevicePasswordResponse {
    pub name: String,
    pub senha: String,
}

fn parse_id(raw: &str) -> Result<DeviceId, ApiError> {
    DeviceId::parse(raw).map_err(|_| ApiError::BadRequest(format!("Invalid device id: {}", raw)))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices",
    request_body = CreateDeviceBody,
    responses(
        (status = 201, description = "Device created", body = DeviceResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Device already registered")
    ),
    tag = "devices"
)]
#[instrument(skip(state, payload), fields(device_name = %payload.name, actor = %context.actor))]
pub async fn create_device_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Json(payload): Json<CreateDeviceBody>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let after = serde_json::json!({
        "name": payload.name,
        "kind": payload.kind,
        "location": payload.location,
        "senha": payload.senha,
        "notes": payload.notes,
    });

    let request = CreateDeviceRequest {
        name: payload.name,
        kind: payload.kind,
        location: payload.location,
        password: payload.senha,
        notes: payload.notes,
    };

    let created = state.devices.create(request).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Create,
            entity::DEVICE,
            format!("Equipamento '{}' criado", created.name),
        )
        .entity_id(created.id.as_str())
        .after(after),
    );

    Ok((StatusCode::CREATED, Json(DeviceResponse::from_data(&created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices",
    params(PageQuery),
    responses(
        (status = 200, description = "List of devices (metadata only)", body = [DeviceResponse])
    ),
    tag = "devices"
)]
#[instrument(skip(state, page), fields(actor = %context.actor))]
pub async fn list_devices_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let (_, page_size) = page.clamp();
    let devices = state.devices.list(page_size, page.offset()).await.map_err(ApiError::from)?;

    Ok(Json(devices.iter().map(DeviceResponse::from_data).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device metadata", body = DeviceResponse),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
#[instrument(skip(state), fields(device_id = %id, actor = %context.actor))]
pub async fn get_device_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let id = parse_id(&id)?;
    let device = state.devices.get_by_id(&id).await.map_err(ApiError::from)?;

    Ok(Json(DeviceResponse::from_data(&device)))
}

#[utoipa::path(
    put,
    path = "/api/v1/devices/{id}",
    params(("id" = String, Path, description = "Device ID")),
    request_body = UpdateDeviceBody,
    responses(
        (status = 200, description = "Device updated", body = DeviceResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
#[instrument(skip(state, payload), fields(device_id = %id, actor = %context.actor))]
pub async fn update_device_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDeviceBody>,
) -> Result<Json<DeviceResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;
    let id = parse_id(&id)?;

    let existing = state.devices.get_by_id(&id).await.map_err(ApiError::from)?;
    let before = serde_json::to_value(&existing)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot device: {}", e)))?;

    let request = UpdateDeviceRequest {
        kind: payload.kind,
        location: payload.location,
        password: payload.senha.clone(),
        notes: payload.notes,
    };

    let updated = state.devices.update(&id, request).await.map_err(ApiError::from)?;

    let mut after = serde_json::to_value(&updated)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot device: {}", e)))?;
    if let Some(senha) = payload.senha {
        after["senha"] = serde_json::Value::String(senha);
    }

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Edit,
            entity::DEVICE,
            format!("Equipamento '{}' editado", updated.name),
        )
        .entity_id(id.as_str())
        .before(before)
        .after(after),
    );

    Ok(Json(DeviceResponse::from_data(&updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/devices/{id}",
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
#[instrument(skip(state), fields(device_id = %id, actor = %context.actor))]
pub async fn delete_device_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    let existing = state.devices.get_by_id(&id).await.map_err(ApiError::from)?;
    let before = serde_json::to_value(&existing)
        .map_err(|e| ApiError::Internal(format!("Failed to snapshot device: {}", e)))?;

    state.devices.delete(&id).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Delete,
            entity::DEVICE,
            format!("Equipamento '{}' excluído", existing.name),
        )
        .entity_id(id.as_str())
        .before(before),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Reveal the decrypted password of a device
///
/// **Admin only.** A secret that cannot be decrypted yields an explicit
/// `decryption_failed` error, never a blank value or the raw ciphertext.
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/password",
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Decrypted password", body = RevealedDevicePasswordResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Stored password cannot be decrypted with the current key")
    ),
    tag = "devices"
)]
#[instrument(skip(state), fields(device_id = %id, actor = %context.actor))]
pub async fn reveal_device_password_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
) -> Result<Json<RevealedDevicePasswordResponse>, ApiError> {
    require_admin(&context)?;
    let id = parse_id(&id)?;

    let device = state.devices.get_by_id(&id).await.map_err(ApiError::from)?;
    let senha = state.devices.reveal_password(&id).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Access,
            entity::DEVICE,
            format!("Senha do equipamento '{}' visualizada", device.name),
        )
        .entity_id(id.as_str()),
    );

    Ok(Json(RevealedDevicePasswordResponse { name: device.name, senha }))
}
