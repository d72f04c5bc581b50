//! Mail account credential repository
//!
//! CRUD operations for mail account records with encryption at rest for
//! the password field. List and get paths never decrypt; the plaintext is
//! only produced by the explicit reveal path.

use crate::crypto::SecretCipher;
use crate::domain::{entity, MailAccountId};
use crate::errors::{Error, Result};
use crate::storage::repositories::{CredentialStore, StoredCredential};
use crate::storage::DbPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::instrument;

/// Database row structure for mail accounts
#[derive(Debug, Clone, FromRow)]
struct MailAccountRow {
    id: String,
    account: String,
    owner: Option<String>,
    password_encrypted: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Mail account metadata. Never carries password material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailAccountData {
    pub id: MailAccountId,
    pub account: String,
    pub owner: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MailAccountRow> for MailAccountData {
    fn from(row: MailAccountRow) -> Self {
        Self {
            id: MailAccountId::from_string(row.id),
            account: row.account,
            owner: row.owner,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create mail account request
#[derive(Debug, Clone)]
pub struct CreateMailAccountRequest {
    pub account: String,
    pub owner: Option<String>,
    /// Plaintext password (encrypted before it reaches the database)
    pub password: String,
    pub notes: Option<String>,
}

/// Update mail account request
#[derive(Debug, Clone, Default)]
pub struct UpdateMailAccountRequest {
    pub owner: Option<String>,
    /// New plaintext password (optional; re-encrypted when present)
    pub password: Option<String>,
    pub notes: Option<String>,
}

/// Repository for mail account data access
#[derive(Clone)]
pub struct MailAccountRepository {
    pool: DbPool,
    cipher: Arc<SecretCipher>,
}

impl MailAccountRepository {
    pub fn new(pool: DbPool, cipher: Arc<SecretCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Get the database pool reference
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create a new mail account credential
    #[instrument(skip(self, request), fields(account = %request.account), name = "db_create_mail_account")]
    pub async fn create(&self, request: CreateMailAccountRequest) -> Result<MailAccountData> {
        let id = MailAccountId::new();
        let now = Utc::now();
        let password_encrypted = self.cipher.encrypt(&request.password)?;

        let result = sqlx::query(
            "INSERT INTO mail_accounts (id, account, owner, password_encrypted, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id.as_str())
        .bind(&request.account)
        .bind(&request.owner)
        .bind(&password_encrypted)
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, account = %request.account, "Failed to create mail account");
            Error::database(e, format!("Mail account '{}' already exists or could not be created", request.account))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::validation("Failed to create mail account"));
        }

        tracing::info!(mail_account_id = %id, account = %request.account, "Created mail account");

        self.get_by_id(&id).await
    }

    /// Get mail account metadata by ID
    #[instrument(skip(self), fields(mail_account_id = %id), name = "db_get_mail_account")]
    pub async fn get_by_id(&self, id: &MailAccountId) -> Result<MailAccountData> {
        let row = sqlx::query_as::<_, MailAccountRow>(
            "SELECT id, account, owner, password_encrypted, notes, created_at, updated_at \
             FROM mail_accounts WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to get mail account '{}'", id)))?;

        row.map(MailAccountData::from)
            .ok_or_else(|| Error::not_found(format!("Mail account with ID '{}' not found", id)))
    }

    /// List mail accounts (metadata only)
    #[instrument(skip(self), name = "db_list_mail_accounts")]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<MailAccountData>> {
        let rows = sqlx::query_as::<_, MailAccountRow>(
            "SELECT id, account, owner, password_encrypted, notes, created_at, updated_at \
             FROM mail_accounts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to list mail accounts"))?;

        Ok(rows.into_iter().map(MailAccountData::from).collect())
    }

    /// Update a mail account; the password is re-encrypted only when a new
    /// one is supplied.
    #[instrument(skip(self, request), fields(mail_account_id = %id), name = "db_update_mail_account")]
    pub async fn update(
        &self,
        id: &MailAccountId,
        request: UpdateMailAccountRequest,
    ) -> Result<MailAccountData> {
        let current = self.get_by_id(id).await?;

        let now = Utc::now();
        let new_owner = request.owner.or(current.owner);
        let new_notes = request.notes.or(current.notes);

        if let Some(password) = request.password {
            let password_encrypted = self.cipher.encrypt(&password)?;
            sqlx::query(
                "UPDATE mail_accounts SET owner = $1, notes = $2, password_encrypted = $3, updated_at = $4 WHERE id = $5",
            )
            .bind(&new_owner)
            .bind(&new_notes)
            .bind(&password_encrypted)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to update mail account '{}'", id)))?;
        } else {
            sqlx::query(
                "UPDATE mail_accounts SET owner = $1, notes = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(&new_owner)
            .bind(&new_notes)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to update mail account '{}'", id)))?;
        }

        tracing::info!(mail_account_id = %id, "Updated mail account");

        self.get_by_id(id).await
    }

    /// Delete a mail account
    #[instrument(skip(self), fields(mail_account_id = %id), name = "db_delete_mail_account")]
    pub async fn delete(&self, id: &MailAccountId) -> Result<()> {
        let result = sqlx::query("DELETE FROM mail_accounts WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to delete mail account '{}'", id)))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("Mail account with ID '{}' not found", id)));
        }

        tracing::info!(mail_account_id = %id, "Deleted mail account");
        Ok(())
    }

    /// Decrypt and return the stored password for the authorized reveal
    /// path. Fails with a decryption error when the blob was produced
    /// under a different master key.
    #[instrument(skip(self), fields(mail_account_id = %id), name = "db_reveal_mail_account_password")]
    pub async fn reveal_password(&self, id: &MailAccountId) -> Result<String> {
        let blob = self.fetch_ciphertext(id.as_str()).await?;
        self.cipher.decrypt(&blob)
    }

    async fn fetch_ciphertext(&self, id: &str) -> Result<String> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT password_encrypted FROM mail_accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to read mail account '{}'", id)))?;

        row.map(|(blob,)| blob)
            .ok_or_else(|| Error::not_found(format!("Mail account with ID '{}' not found", id)))
    }
}

#[async_trait::async_trait]
impl CredentialStore for MailAccountRepository {
    fn entity_type(&self) -> &'static str {
        entity::MAIL_ACCOUNT
    }

    async fn list_credentials(&self) -> Result<Vec<StoredCredential>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, account, password_encrypted FROM mail_accounts ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to list mail account credentials"))?;

        Ok(rows
            .into_iter()
            .map(|(id, label, ciphertext)| StoredCredential { id, label, ciphertext })
            .collect())
    }

    async fn update_ciphertext(&self, id: &str, ciphertext: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE mail_accounts SET password_encrypted = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(ciphertext)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, format!("Failed to rewrite mail account '{}'", id)))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("Mail account with ID '{}' not found", id)));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MailAccountRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailAccountRepository")
            .field("pool", &"[DbPool]")
            .field("cipher", &self.cipher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::memory_pool;

    async fn test_repo() -> MailAccountRepository {
        let pool = memory_pool().await;
        let cipher = Arc::new(SecretCipher::from_material("chave-de-teste").unwrap());
        MailAccountRepository::new(pool, cipher)
    }

    fn request(account: &str, password: &str) -> CreateMailAccountRequest {
        CreateMailAccountRequest {
            account: account.to_string(),
            owner: Some("suporte".to_string()),
            password: password.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_encrypts_at_rest() {
        let repo = test_repo().await;
        let created = repo.create(request("suporte@empresa.com.br", "Secr3t!")).await.unwrap();

        let (stored,): (String,) =
            sqlx::query_as("SELECT password_encrypted FROM mail_accounts WHERE id = $1")
                .bind(created.id.as_str())
                .fetch_one(repo.pool())
                .await
                .unwrap();

        assert_ne!(stored, "Secr3t!");
        assert!(stored.contains(':'));
        assert_eq!(repo.reveal_password(&created.id).await.unwrap(), "Secr3t!");
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let repo = test_repo().await;
        repo.create(request("conta@empresa.com.br", "a")).await.unwrap();

        let result = repo.create(request("conta@empresa.com.br", "b")).await;
        assert!(matches!(result, Err(Error::Database { .. })));
    }

    #[tokio::test]
    async fn test_update_without_password_keeps_ciphertext() {
        let repo = test_repo().await;
        let created = repo.create(request("conta@empresa.com.br", "antiga")).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                UpdateMailAccountRequest {
                    owner: Some("financeiro".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.owner.as_deref(), Some("financeiro"));
        assert_eq!(repo.reveal_password(&created.id).await.unwrap(), "antiga");
    }

    #[tokio::test]
    async fn test_update_with_password_reencrypts() {
        let repo = test_repo().await;
        let created = repo.create(request("conta@empresa.com.br", "antiga")).await.unwrap();

        repo.update(
            &created.id,
            UpdateMailAccountRequest { password: Some("nova".to_string()), ..Default::default() },
        )
        .await
        .unwrap();

        assert_eq!(repo.reveal_password(&created.id).await.unwrap(), "nova");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = test_repo().await;
        let result = repo.delete(&MailAccountId::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_credential_store_lists_in_creation_order() {
        let repo = test_repo().await;
        repo.create(request("a@empresa.com.br", "1")).await.unwrap();
        repo.create(request("b@empresa.com.br", "2")).await.unwrap();
        repo.create(request("c@empresa.com.br", "3")).await.unwrap();

        let credentials = repo.list_credentials().await.unwrap();
        let labels: Vec<&str> = credentials.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["a@empresa.com.br", "b@empresa.com.br", "c@empresa.com.br"]);
    }
}
