//! Support utilities for API integration tests
//!
//! Boots the real router on a random port over an in-memory SQLite
//! database and drives it with reqwest.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use sentinela::api::{build_router, build_state, ApiState};
use sentinela::crypto::SecretCipher;
use sentinela::storage::{run_migrations, AuditLogEntry, AuditLogFilters, DbPool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::task::JoinHandle;

/// Master key material the test server is started with.
pub const TEST_MASTER_KEY: &str = "chave-mestra-de-teste";

/// Test server instance
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: DbPool,
    pub state: ApiState,
    pub client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestApp {
    /// Start a test server on a random available port
    pub async fn spawn() -> Self {
        Self::spawn_with_key(TEST_MASTER_KEY).await
    }

    /// Start a test server with specific master key material
    pub async fn spawn_with_key(master_key: &str) -> Self {
        let pool = memory_pool().await;
        let cipher = Arc::new(SecretCipher::from_material(master_key).expect("derive cipher"));
        let state = build_state(pool.clone(), cipher);
        let router = build_router(state.clone());

        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind to random port");
        let addr = listener.local_addr().expect("get local addr");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server error");
        });

        // Verify the server is accepting connections before returning
        for _ in 0..20 {
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }

        TestApp { addr, pool, state, client: reqwest::Client::new(), _handle: handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET with administrator identity headers
    pub fn admin_get(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.get(self.url(path)), "carla", "administrador")
    }

    pub fn admin_post(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.post(self.url(path)), "carla", "administrador")
    }

    pub fn admin_put(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.put(self.url(path)), "carla", "administrador")
    }

    pub fn admin_delete(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.delete(self.url(path)), "carla", "administrador")
    }

    /// GET with operator (non-admin) identity headers
    pub fn operator_get(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.get(self.url(path)), "bruno", "operador")
    }

    pub fn operator_post(&self, path: &str) -> reqwest::RequestBuilder {
        with_identity(self.client.post(self.url(path)), "bruno", "operador")
    }

    /// Poll the audit log until at least `min` entries match the filters.
    /// Audit writes are detached from the request path, so tests wait for
    /// them to land.
    pub async fn wait_for_audit_entries(
        &self,
        filters: AuditLogFilters,
        min: usize,
    ) -> Vec<AuditLogEntry> {
        for _ in 0..100 {
            let entries =
                self.state.audit_logs.query_logs(&filters, 100, 0).await.expect("query audit log");
            if entries.len() >= min {
                return entries;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("expected at least {} audit entries matching the filters", min);
    }
}

fn with_identity(
    builder: reqwest::RequestBuilder,
    actor: &str,
    level: &str,
) -> reqwest::RequestBuilder {
    builder.header("x-auth-actor", actor).header("x-auth-level", level)
}

/// In-memory SQLite pool with migrations applied. A single connection
/// keeps the database alive for the whole test.
pub async fn memory_pool() -> DbPool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("sqlite options");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    run_migrations(&pool).await.expect("apply migrations");
    pool
}
