//! HTTP handler modules.

pub mod audit_log;
pub mod devices;
pub mod health;
pub mod key_migration;
pub mod mail_accounts;
pub mod pagination;

pub use audit_log::{export_audit_logs, list_audit_logs};
pub use devices::{
    create_device_handler, delete_device_handler, get_device_handler, list_devices_handler,
    reveal_device_password_handler, update_device_handler,
};
pub use health::health_handler;
pub use key_migration::run_key_migration_handler;
pub use mail_accounts::{
    create_mail_account_handler, delete_mail_account_handler, get_mail_account_handler,
    list_mail_accounts_handler, reveal_mail_account_password_handler,
    update_mail_account_handler,
};
pub use pagination::{PageQuery, PagedResponse, MAX_PAGE_SIZE};
