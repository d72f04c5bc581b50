//! End-to-end tests for the administrative key migration endpoint.

mod common;

use std::sync::Arc;

use common::{TestApp, TEST_MASTER_KEY};
use sentinela::crypto::SecretCipher;
use sentinela::domain::{entity, DeviceKind};
use sentinela::storage::repositories::{CreateDeviceRequest, CreateMailAccountRequest};
use sentinela::storage::{AuditLogFilters, DeviceRepository, MailAccountRepository};
use serde_json::json;

const OLD_KEY: &str = "chave-mestra-antiga";

/// Seed credential records encrypted under the old key, bypassing the API
/// (as if the records predate a key rotation).
async fn seed_under_old_key(app: &TestApp, mail_accounts: usize, devices: usize) {
    let old_cipher = Arc::new(SecretCipher::from_material(OLD_KEY).unwrap());

    let mail_repo = MailAccountRepository::new(app.pool.clone(), old_cipher.clone());
    for i in 0..mail_accounts {
        mail_repo
            .create(CreateMailAccountRequest {
                account: format!("conta-{}@empresa.com.br", i),
                owner: None,
                password: format!("senha-email-{}", i),
                notes: None,
            })
            .await
            .unwrap();
    }

    let device_repo = DeviceRepository::new(app.pool.clone(), old_cipher);
    for i in 0..devices {
        device_repo
            .create(CreateDeviceRequest {
                name: format!("srv-{:02}", i),
                kind: DeviceKind::Server,
                location: None,
                password: format!("senha-dev-{}", i),
                notes: None,
            })
            .await
            .unwrap();
    }
}

async fn all_ciphertexts(app: &TestApp) -> Vec<String> {
    let mut blobs: Vec<String> = sqlx::query_scalar(
        "SELECT password_encrypted FROM mail_accounts ORDER BY created_at ASC, rowid ASC",
    )
    .fetch_all(&app.pool)
    .await
    .unwrap();
    let devices: Vec<String> = sqlx::query_scalar(
        "SELECT password_encrypted FROM devices ORDER BY created_at ASC, rowid ASC",
    )
    .fetch_all(&app.pool)
    .await
    .unwrap();
    blobs.extend(devices);
    blobs
}

#[tokio::test]
async fn migration_reencrypts_every_store_under_the_current_key() {
    let app = TestApp::spawn().await;
    seed_under_old_key(&app, 3, 2).await;

    let response = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["attempted"], 5);
    assert_eq!(body["succeeded"], 5);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["partial"], false);
    assert_eq!(body["failureDetails"], json!([]));

    // Every blob now decrypts under the current key and no longer under
    // the old one.
    let current = SecretCipher::from_material(TEST_MASTER_KEY).unwrap();
    let old = SecretCipher::from_material(OLD_KEY).unwrap();
    for blob in all_ciphertexts(&app).await {
        assert!(current.decrypt(&blob).is_ok());
        assert!(old.decrypt(&blob).is_err());
    }

    // The reveal path now works through the API
    let (id,): (String,) =
        sqlx::query_as("SELECT id FROM mail_accounts ORDER BY created_at ASC, rowid ASC LIMIT 1")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    let revealed: serde_json::Value = app
        .admin_get(&format!("/api/v1/mail-accounts/{}/password", id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(revealed["senha"], "senha-email-0");
}

#[tokio::test]
async fn wrong_old_key_fails_every_record_and_corrupts_nothing() {
    let app = TestApp::spawn().await;
    seed_under_old_key(&app, 10, 0).await;

    let before = all_ciphertexts(&app).await;

    let response = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": "chave-completamente-errada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["succeeded"], 0);
    assert_eq!(body["failed"], 10);
    assert_eq!(body["failureDetails"].as_array().unwrap().len(), 10);
    for failure in body["failureDetails"].as_array().unwrap() {
        assert_eq!(failure["entityType"], "email");
        assert!(failure["reason"].as_str().unwrap().contains("descriptografar"));
    }

    // No partial corruption: every original ciphertext is untouched
    assert_eq!(all_ciphertexts(&app).await, before);
}

#[tokio::test]
async fn poisoned_records_are_reported_without_aborting_the_batch() {
    let app = TestApp::spawn().await;
    seed_under_old_key(&app, 6, 0).await;

    // Poison two records with garbage blobs
    sqlx::query(
        "UPDATE mail_accounts SET password_encrypted = 'lixo' \
         WHERE id IN (SELECT id FROM mail_accounts ORDER BY rowid ASC LIMIT 2)",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let body: serde_json::Value = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["attempted"], 6);
    assert_eq!(body["succeeded"], 4);
    assert_eq!(body["failed"], 2);
}

#[tokio::test]
async fn rerunning_with_the_same_old_key_reports_migrated_records_as_failures() {
    let app = TestApp::spawn().await;
    seed_under_old_key(&app, 3, 0).await;

    let first: serde_json::Value = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["succeeded"], 3);

    let second: serde_json::Value = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["succeeded"], 0);
    assert_eq!(second["failed"], 3);
}

#[tokio::test]
async fn migration_requires_administrator_access() {
    let app = TestApp::spawn().await;

    let response = app
        .operator_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn migration_run_is_recorded_as_a_sensitive_audit_action() {
    let app = TestApp::spawn().await;
    seed_under_old_key(&app, 1, 0).await;

    app.admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": OLD_KEY}))
        .send()
        .await
        .unwrap();

    let filters = AuditLogFilters {
        entity_type: Some(entity::MASTER_KEY.to_string()),
        ..Default::default()
    };
    let entries = app.wait_for_audit_entries(filters, 1).await;
    assert!(entries[0].sensitive);
    assert!(entries[0].description.contains("1 registros migrados"));
}

#[tokio::test]
async fn empty_old_key_is_a_client_error() {
    let app = TestApp::spawn().await;

    let response = app
        .admin_post("/api/v1/admin/key-migration")
        .json(&json!({"oldKey": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
