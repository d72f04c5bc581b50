//! Audit log API handlers
//!
//! Paginated, filterable read access over the audit trail plus an
//! unpaginated streaming CSV export. Both reads are themselves recorded as
//! sensitive audit actions.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{
    api::{
        error::ApiError,
        handlers::pagination::{PageQuery, PagedResponse},
        routes::ApiState,
    },
    audit::{AuditEvent, RequestMeta},
    auth::AuthContext,
    domain::{entity, AuditAction},
    errors::Result,
    storage::repositories::{AuditLogEntry, AuditLogFilters},
};

/// Rows fetched per page while streaming the CSV export.
const EXPORT_BATCH_SIZE: i64 = 500;

/// Fixed CSV column order for the export endpoint.
const CSV_HEADER: &str = "timestamp,actor,action,entityType,entityId,description,ip,sensitive\n";

/// Filter parameters shared by the query and export endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditFilterQuery {
    /// Filter by actor substring
    pub actor: Option<String>,
    /// Filter by action (e.g. "criar")
    pub action: Option<String>,
    /// Filter by entity type (e.g. "email")
    pub entity_type: Option<String>,
    /// Filter by sensitivity classification
    pub sensitive: Option<bool>,
    /// Start of the creation date range (ISO 8601)
    pub date_from: Option<String>,
    /// End of the creation date range (ISO 8601)
    pub date_to: Option<String>,
}

impl AuditFilterQuery {
    fn into_filters(self) -> std::result::Result<AuditLogFilters, ApiError> {
        let action = self
            .action
            .map(|raw| {
                raw.parse::<AuditAction>()
                    .map_err(|e| ApiError::BadRequest(format!("Invalid action filter: {}", e)))
            })
            .transpose()?;

        Ok(AuditLogFilters {
            actor_contains: self.actor,
            action,
            entity_type: self.entity_type,
            sensitive: self.sensitive,
            start_date: parse_date(self.date_from.as_deref(), "dateFrom")?,
            end_date: parse_date(self.date_to.as_deref(), "dateTo")?,
        })
    }
}

fn parse_date(
    raw: Option<&str>,
    field: &str,
) -> std::result::Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| ApiError::BadRequest(format!("Invalid {} format: {}", field, e)))
    })
    .transpose()
}

/// List audit entries with optional filtering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(AuditFilterQuery, PageQuery),
    responses(
        (status = 200, description = "Audit entries retrieved successfully", body = PagedResponse<AuditLogEntry>),
        (status = 400, description = "Invalid filter values"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Storage unavailable")
    ),
    tag = "audit"
)]
#[instrument(skip(state, filters, page), fields(actor = %context.actor))]
pub async fn list_audit_logs(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Query(filters): Query<AuditFilterQuery>,
    Query(page): Query<PageQuery>,
) -> std::result::Result<Json<PagedResponse<AuditLogEntry>>, ApiError> {
    let filters = filters.into_filters()?;
    let (page_number, page_size) = page.clamp();
    let offset = page.offset();

    let entries =
        state.audit_logs.query_logs(&filters, page_size, offset).await.map_err(ApiError::from)?;
    let total = state.audit_logs.count_logs(&filters).await.map_err(ApiError::from)?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(AuditAction::Access, entity::AUDIT_LOG, "Consulta ao log de auditoria"),
    );

    Ok(Json(PagedResponse::new(entries, total, page_number, page_size)))
}

/// Export every matching audit entry as CSV
///
/// Applies the same filters as the list endpoint with no pagination; the
/// response is streamed, paging against the store internally.
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs/export",
    params(AuditFilterQuery),
    responses(
        (status = 200, description = "CSV document with one row per entry", content_type = "text/csv"),
        (status = 400, description = "Invalid filter values"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "audit"
)]
#[instrument(skip(state, filters), fields(actor = %context.actor))]
pub async fn export_audit_logs(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    Query(filters): Query<AuditFilterQuery>,
) -> std::result::Result<Response, ApiError> {
    let filters = filters.into_filters()?;

    state.recorder.record_detached(
        (&context).into(),
        meta,
        AuditEvent::new(
            AuditAction::Export,
            entity::AUDIT_LOG,
            "Exportação do log de auditoria em CSV",
        ),
    );

    let entries = state.audit_logs.stream_logs(filters, EXPORT_BATCH_SIZE);
    let body = Body::from_stream(csv_stream(entries));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, "attachment; filename=\"auditoria.csv\"")
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build export response: {}", e)))
}

/// Turn the entry stream into CSV lines, header first.
fn csv_stream(
    entries: impl Stream<Item = Result<AuditLogEntry>> + Send + 'static,
) -> impl Stream<Item = std::result::Result<String, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        yield Ok(CSV_HEADER.to_string());
        futures::pin_mut!(entries);
        while let Some(entry) = entries.next().await {
            match entry {
                Ok(entry) => yield Ok(csv_row(&entry)),
                Err(err) => {
                    yield Err(std::io::Error::other(err.to_string()));
                    break;
                }
            }
        }
    }
}

fn csv_row(entry: &AuditLogEntry) -> String {
    let fields = [
        entry.created_at.to_rfc3339(),
        entry.actor.clone(),
        entry.action.clone(),
        entry.entity_type.clone(),
        entry.entity_id.clone().unwrap_or_default(),
        entry.description.clone(),
        entry.client_ip.clone().unwrap_or_default(),
        entry.sensitive.to_string(),
    ];
    let mut row = fields.iter().map(|field| csv_field(field)).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
