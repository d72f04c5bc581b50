//! Device credential repository
//!
//! Same encryption-at-rest contract as mail accounts, for password-bearing
//! inventory devices (servers, printers, network assets).

use crate::crypto::SecretCipher;
use crate::domain::{entity, DeviceId, DeviceKind};
use crate::errors::{Error, Result};
use crate::storage::repositories::{CredentialStore, StoredCredential};
use crate::storage::DbPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::instrument;

/// Database row structure for devices
#[derive(Debug, Clone, FromRow)]
struct DeviceRow {
    id: String,
    name: String,
    kind: String,
    location: Option<String>,
    password_encrypted: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Device metadata. Never carries password material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceData {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create device request
#[derive(Debug, Clone)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub kind: DeviceKind,
    pub location: Option<String>,
    /// Plaintext password (encrypted before it reaches the database)
    pub password: String,
    pub notes: Option<String>,
}

/// Update device request
#[derive(Debug, Clone, Default)]
pub struct UpdateDeviceRequest {
    pub kind: Option<DeviceKind>,
    pub location: Option<String>,
    /// New plaintext password (optional; re-encrypted when present)
    pub password: Option<String>,
    pub notes: Option<String>,
}

/// Repository for device data access
#[derive(Clone)]
pub struct DeviceRepository {
    pool: DbPool,
    cipher: Arc<SecretCipher>,
}

impl DeviceRepository {
    pub fn new(pool: DbPool, cipher: Arc<SecretCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Get the database pool reference
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create a new device credential
    #[instrument(skip(self, request), fields(device_name = %request.name), name = "db_create_device")]
    pub async fn create(&self, request: CreateDeviceRequest) -> Result<DeviceData> {
        let id = DeviceId::new();
        let now = Utc::now();
        let password_encrypted = self.cipher.encrypt(&request.password)?;

        let result = sqlx::query(
            "INSERT INTO devices (id, name, kind, location, password_encrypted, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.as_str())
        .bind(&request.name)
        .bind(request.kind.as_str())
        .bind(&request.location)
        .bind(&password_encrypted)
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, device_name = %request.name, "Failed to create device");
            Error::database(e, format!("Device '{}' already exists or could not be created", request.name))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::validation("Failed to create device"));
        }

        tracing::info!(device_id = %id, device_name = %request.name, "Created device");

        self.get_by_id(&id).await
    }

    /// Get device metadata by ID
    #[instrument(skip(self), fields(device_id = %id), name = "db_get_device")]
    pub async fn get_by_id(&self, id: &DeviceId) -> Result<DeviceData> {
        let row = sqlx::query_as::<_, DeviceRow>(
            "SELECT id, name, kind, location, password_encrypted, notes, created_at, updated_at \
             FROM devices WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to get device '{}'", id)))?;

        match row {
            Some(row) => device_from_row(row),
            None => Err(Error::not_found(format!("Device with ID '{}' not found", id))),
        }
    }

    /// List devices (metadata only)
    #[instrument(skip(self), name = "db_list_devices")]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DeviceData>> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT id, name, kind, location, password_encrypted, notes, created_at, updated_at \
             FROM devices ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to list devices"))?;

        rows.into_iter().map(device_from_row).collect()
    }

    /// Update a device; the password is re-encrypted only when a new one
    /// is supplied.
    #[instrument(skip(self, request), fields(device_id = %id), name = "db_update_device")]
    pub async fn update(&self, id: &DeviceId, request: UpdateDeviceRequest) -> Result<DeviceData> {
        let current = self.get_by_id(id).await?;

        let now = Utc::now();
        let new_kind = request.kind.unwrap_or(current.kind);
        let new_location = request.location.or(current.location);
        let new_notes = request.notes.or(current.notes);

        if let Some(password) = request.password {
            let password_encrypted = self.cipher.encrypt(&password)?;
            sqlx::query(
                "UPDATE devices SET kind = $1, location = $2, notes = $3, password_encrypted = $4, updated_at = $5 WHERE id = $6",
            )
            .bind(new_kind.as_str())
            .bind(&new_location)
            .bind(&new_notes)
            .bind(&password_encrypted)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to update device '{}'", id)))?;
        } else {
            sqlx::query(
                "UPDATE devices SET kind = $1, location = $2, notes = $3, updated_at = $4 WHERE id = $5",
            )
            .bind(new_kind.as_str())
            .bind(&new_location)
            .bind(&new_notes)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to update device '{}'", id)))?;
        }

        tracing::info!(device_id = %id, "Updated device");

        self.get_by_id(id).await
    }

    /// Delete a device
    #[instrument(skip(self), fields(device_id = %id), name = "db_delete_device")]
    pub async fn delete(&self, id: &DeviceId) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to delete device '{}'", id)))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("Device with ID '{}' not found", id)));
        }

        tracing::info!(device_id = %id, "Deleted device");
        Ok(())
    }

    /// Decrypt and return the stored password for the authorized reveal
    /// path.
    #[instrument(skip(self), fields(device_id = %id), name = "db_reveal_device_password")]
    pub async fn reveal_password(&self, id: &DeviceId) -> Result<String> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT password_encrypted FROM devices WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to read device '{}'", id)))?;

        let blob = row
            .map(|(blob,)| blob)
            .ok_or_else(|| Error::not_found(format!("Device with ID '{}' not found", id)))?;

        self.cipher.decrypt(&blob)
    }
}

fn device_from_row(row: DeviceRow) -> Result<DeviceData> {
    let kind = row
        .kind
        .parse::<DeviceKind>()
        .map_err(|_| Error::internal(format!("Unknown device kind: {}", row.kind)))?;

    Ok(DeviceData {
        id: DeviceId::from_string(row.id),
        name: row.name,
        kind,
        location: row.location,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait::async_trait]
impl CredentialStore for DeviceRepository {
    fn entity_type(&self) -> &'static str {
        entity::DEVICE
    }

    async fn list_credentials(&self) -> Result<Vec<StoredCredential>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, name, password_encrypted FROM devices ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to list device credentials"))?;

        Ok(rows
            .into_iter()
            .map(|(id, label, ciphertext)| StoredCredential { id, label, ciphertext })
            .collect())
    }

    async fn update_ciphertext(&self, id: &str, ciphertext: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE devices SET password_encrypted = $1, updated_at = $2 WHERE id = $3")
                .bind(ciphertext)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::database(e, format!("Failed to rewrite device '{}'", id)))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("Device with ID '{}' not found", id)));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRepository")
            .field("pool", &"[DbPool]")
            .field("cipher", &self.cipher)
            .finish()
    }
}
