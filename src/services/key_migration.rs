//! Master key migration service
//!
//! Re-encrypts every stored secret from an old master key to the current
//! one. Records are processed by a bounded worker pool; each record's
//! outcome is an explicit `Result` collected into a shared accumulator, so
//! one record's failure can never abort the batch. The caller can cancel
//! the run at any time: no new record operations are launched, in-flight
//! ones finish, and the partial result is returned marked as such.
//!
//! A record that was already re-encrypted under the current key fails to
//! decrypt under the retried old key and is reported as a failure — the
//! store carries no marker distinguishing "already migrated" from
//! "genuinely wrong key".

use crate::crypto::SecretCipher;
use crate::errors::{Error, Result};
use crate::storage::repositories::{CredentialStore, StoredCredential};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Default number of concurrent record operations
pub const DEFAULT_WORKERS: usize = 8;

/// One record that could not be migrated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFailure {
    pub entity_type: String,
    pub record_id: String,
    pub reason: String,
}

/// Full accounting of one migration run. Returned to the caller, never
/// persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    /// Records for which an operation was launched
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// True when the run was cancelled before covering every record
    pub partial: bool,
    /// Per-record failures, in processing order
    pub failure_details: Vec<MigrationFailure>,
}

/// Batch re-encryption of every credential store under the current key.
#[derive(Clone)]
pub struct KeyMigrationService {
    stores: Vec<Arc<dyn CredentialStore>>,
    cipher: Arc<SecretCipher>,
    workers: usize,
}

impl KeyMigrationService {
    /// Create a migration service over the given credential stores and
    /// the current-key cipher.
    pub fn new(stores: Vec<Arc<dyn CredentialStore>>, cipher: Arc<SecretCipher>) -> Self {
        Self { stores, cipher, workers: DEFAULT_WORKERS }
    }

    /// Override the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Re-encrypt every stored secret from `old_key_material` to the
    /// current key and return the full accounting.
    #[instrument(skip(self, old_key_material, cancel), name = "key_migration")]
    pub async fn migrate(
        &self,
        old_key_material: &str,
        cancel: CancellationToken,
    ) -> Result<MigrationResult> {
        let old_cipher = Arc::new(SecretCipher::from_material(old_key_material)?);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let outcomes: Arc<Mutex<Vec<(usize, std::result::Result<(), MigrationFailure>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();
        let mut attempted = 0usize;
        let mut partial = false;

        'stores: for store in &self.stores {
            let records = store.list_credentials().await?;
            info!(
                entity_type = store.entity_type(),
                records = records.len(),
                "Migrating credential store"
            );

            for record in records {
                if cancel.is_cancelled() {
                    warn!(
                        attempted,
                        "Key migration cancelled; returning partial result"
                    );
                    partial = true;
                    break 'stores;
                }

                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::internal("Migration worker pool closed unexpectedly"))?;

                let position = attempted;
                attempted += 1;

                let store = store.clone();
                let old_cipher = old_cipher.clone();
                let current_cipher = self.cipher.clone();
                let outcomes = outcomes.clone();

                tasks.spawn(async move {
                    let _permit = permit;
                    let outcome =
                        migrate_record(store.as_ref(), &old_cipher, &current_cipher, &record).await;
                    outcomes.lock().await.push((position, outcome));
                });
            }
        }

        while tasks.join_next().await.is_some() {}

        let mut collected = outcomes.lock().await;
        collected.sort_by_key(|(position, _)| *position);

        let mut result =
            MigrationResult { attempted, partial, ..Default::default() };
        for (_, outcome) in collected.drain(..) {
            match outcome {
                Ok(()) => result.succeeded += 1,
                Err(failure) => {
                    result.failed += 1;
                    result.failure_details.push(failure);
                }
            }
        }

        info!(
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            partial = result.partial,
            "Key migration finished"
        );

        Ok(result)
    }
}

/// Migrate a single record: decrypt under the old key, re-encrypt under
/// the current key, write back by id. Nothing is written when decryption
/// fails, so a failed record keeps its original ciphertext.
async fn migrate_record(
    store: &dyn CredentialStore,
    old_cipher: &SecretCipher,
    current_cipher: &SecretCipher,
    record: &StoredCredential,
) -> std::result::Result<(), MigrationFailure> {
    let failure = |reason: String| MigrationFailure {
        entity_type: store.entity_type().to_string(),
        record_id: record.id.clone(),
        reason,
    };

    let plaintext = old_cipher
        .decrypt(&record.ciphertext)
        .map_err(|err| failure(format!("falha ao descriptografar: {}", err)))?;

    let reencrypted = current_cipher
        .encrypt(&plaintext)
        .map_err(|err| failure(format!("falha ao recriptografar: {}", err)))?;

    store
        .update_ciphertext(&record.id, &reencrypted)
        .await
        .map_err(|err| failure(format!("falha ao gravar: {}", err)))
}

impl std::fmt::Debug for KeyMigrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMigrationService")
            .field("stores", &self.stores.len())
            .field("workers", &self.workers)
            .finish()
    }
}
