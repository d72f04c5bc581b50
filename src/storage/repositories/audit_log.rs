//! Append-only audit log repository
//!
//! Entries are created exactly once by the audit recorder and never
//! mutated or deleted through this interface; the repository exposes no
//! update or delete operation. Query ordering is creation time descending
//! with the AUTOINCREMENT id as a stable insertion-order tie-break.

use crate::domain::{AccessLevel, AuditAction};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;
use utoipa::ToSchema;

/// New audit entry payload, already redacted by the recorder.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub access_level: AccessLevel,
    pub sensitive: bool,
}

/// Database row structure for audit entries
#[derive(Debug, Clone, FromRow)]
struct AuditLogRow {
    id: i64,
    actor: String,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    description: String,
    before_snapshot: Option<String>,
    after_snapshot: Option<String>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    access_level: String,
    sensitive: bool,
    created_at: DateTime<Utc>,
}

/// One persisted audit entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor: String,
    /// Persisted action vocabulary value (e.g. "criar")
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    /// Redacted snapshot of the entity before the action
    pub before: Option<serde_json::Value>,
    /// Redacted snapshot of the entity after the action
    pub after: Option<serde_json::Value>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub access_level: String,
    pub sensitive: bool,
    pub created_at: DateTime<Utc>,
}

/// Filters applied as a logical AND; unset filters are no-ops.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilters {
    pub actor_contains: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub sensitive: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

const SELECT_COLUMNS: &str = "SELECT id, actor, action, entity_type, entity_id, description, \
     before_snapshot, after_snapshot, client_ip, user_agent, access_level, sensitive, created_at \
     FROM audit_log";

/// Repository for audit log interactions
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: DbPool,
}

impl AuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the database pool reference
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Append one audit entry. Returns the assigned entry id.
    #[instrument(
        skip(self, entry),
        fields(action = %entry.action, entity_type = %entry.entity_type),
        name = "db_append_audit_entry"
    )]
    pub async fn append(&self, entry: NewAuditEntry) -> Result<i64> {
        let now = Utc::now();

        let before_snapshot = entry
            .before
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| Error::serialization(e, "Failed to serialize audit before snapshot"))?;
        let after_snapshot = entry
            .after
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| Error::serialization(e, "Failed to serialize audit after snapshot"))?;

        let result = sqlx::query(
            "INSERT INTO audit_log (actor, action, entity_type, entity_id, description, \
             before_snapshot, after_snapshot, client_ip, user_agent, access_level, sensitive, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&entry.actor)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.description)
        .bind(&before_snapshot)
        .bind(&after_snapshot)
        .bind(&entry.client_ip)
        .bind(&entry.user_agent)
        .bind(entry.access_level.as_str())
        .bind(entry.sensitive)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to append audit entry"))?;

        Ok(result.last_insert_rowid())
    }

    /// Query audit entries with filters, newest first.
    #[instrument(skip(self, filters), name = "db_query_audit_logs")]
    pub async fn query_logs(
        &self,
        filters: &AuditLogFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>> {
        let mut builder = QueryBuilder::new(SELECT_COLUMNS);
        push_filters(&mut builder, filters);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows: Vec<AuditLogRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to query audit logs"))?;

        rows.into_iter().map(entry_from_row).collect()
    }

    /// Count audit entries matching the filters.
    #[instrument(skip(self, filters), name = "db_count_audit_logs")]
    pub async fn count_logs(&self, filters: &AuditLogFilters) -> Result<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM audit_log");
        push_filters(&mut builder, filters);

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to count audit logs"))?;

        row.try_get::<i64, _>(0)
            .map_err(|e| Error::database(e, "Failed to read audit log count"))
    }

    /// Stream all entries matching the filters by paging internally in
    /// `batch_size` chunks, so an arbitrarily large log is never
    /// materialized in memory.
    pub fn stream_logs(
        &self,
        filters: AuditLogFilters,
        batch_size: i64,
    ) -> BoxStream<'static, Result<AuditLogEntry>> {
        let repository = self.clone();
        Box::pin(try_stream! {
            let mut offset = 0i64;
            loop {
                let batch = repository.query_logs(&filters, batch_size, offset).await?;
                let batch_len = batch.len() as i64;
                for entry in batch {
                    yield entry;
                }
                if batch_len < batch_size {
                    break;
                }
                offset += batch_len;
            }
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &AuditLogFilters) {
    builder.push(" WHERE 1 = 1");

    if let Some(actor) = &filters.actor_contains {
        builder.push(" AND actor LIKE ");
        builder.push_bind(format!("%{}%", actor));
    }
    if let Some(action) = filters.action {
        builder.push(" AND action = ");
        builder.push_bind(action.as_str());
    }
    if let Some(entity_type) = &filters.entity_type {
        builder.push(" AND entity_type = ");
        builder.push_bind(entity_type.clone());
    }
    if let Some(sensitive) = filters.sensitive {
        builder.push(" AND sensitive = ");
        builder.push_bind(sensitive);
    }
    if let Some(start) = filters.start_date {
        builder.push(" AND created_at >= ");
        builder.push_bind(start);
    }
    if let Some(end) = filters.end_date {
        builder.push(" AND created_at <= ");
        builder.push_bind(end);
    }
}

fn entry_from_row(row: AuditLogRow) -> Result<AuditLogEntry> {
    let before = row
        .before_snapshot
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| Error::serialization(e, "Stored audit before snapshot is not valid JSON"))?;
    let after = row
        .after_snapshot
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| Error::serialization(e, "Stored audit after snapshot is not valid JSON"))?;

    Ok(AuditLogEntry {
        id: row.id,
        actor: row.actor,
        action: row.action,
        entity_type: row.entity_type,
        entity_id: row.entity_id,
        description: row.description,
        before,
        after,
        client_ip: row.client_ip,
        user_agent: row.user_agent,
        access_level: row.access_level,
        sensitive: row.sensitive,
        created_at: row.created_at,
    })
}
