//! Router and shared API state.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::audit::AuditRecorder;
use crate::auth::middleware::authenticate;
use crate::crypto::SecretCipher;
use crate::services::KeyMigrationService;
use crate::storage::repositories::{
    AuditLogRepository, CredentialStore, DeviceRepository, MailAccountRepository,
};
use crate::storage::DbPool;

use super::handlers::{
    create_device_handler, create_mail_account_handler, delete_device_handler,
    delete_mail_account_handler, export_audit_logs, get_device_handler, get_mail_account_handler,
    health_handler, list_audit_logs, list_devices_handler, list_mail_accounts_handler,
    reveal_device_password_handler, reveal_mail_account_password_handler,
    run_key_migration_handler, update_device_handler, update_mail_account_handler,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub mail_accounts: MailAccountRepository,
    pub devices: DeviceRepository,
    pub audit_logs: AuditLogRepository,
    pub recorder: AuditRecorder,
    pub key_migration: Arc<KeyMigrationService>,
}

/// Wire repositories, recorder and the migration service around one pool
/// and the process-wide cipher.
pub fn build_state(pool: DbPool, cipher: Arc<SecretCipher>) -> ApiState {
    let mail_accounts = MailAccountRepository::new(pool.clone(), cipher.clone());
    let devices = DeviceRepository::new(pool.clone(), cipher.clone());
    let audit_logs = AuditLogRepository::new(pool);
    let recorder = AuditRecorder::new(audit_logs.clone());

    let stores: Vec<Arc<dyn CredentialStore>> =
        vec![Arc::new(mail_accounts.clone()), Arc::new(devices.clone())];
    let key_migration = Arc::new(KeyMigrationService::new(stores, cipher));

    ApiState { mail_accounts, devices, audit_logs, recorder, key_migration }
}

/// Build the full application router.
pub fn build_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/mail-accounts",
            get(list_mail_accounts_handler).post(create_mail_account_handler),
        )
        .route(
            "/api/v1/mail-accounts/{id}",
            get(get_mail_account_handler)
                .put(update_mail_account_handler)
                .delete(delete_mail_account_handler),
        )
        .route("/api/v1/mail-accounts/{id}/password", get(reveal_mail_account_password_handler))
        .route("/api/v1/devices", get(list_devices_handler).post(create_device_handler))
        .route(
            "/api/v1/devices/{id}",
            get(get_device_handler).put(update_device_handler).delete(delete_device_handler),
        )
        .route("/api/v1/devices/{id}/password", get(reveal_device_password_handler))
        .route("/api/v1/audit-logs", get(list_audit_logs))
        .route("/api/v1/audit-logs/export", get(export_audit_logs))
        .route("/api/v1/admin/key-migration", post(run_key_migration_handler))
        .layer(middleware::from_fn(authenticate));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
