//! Liveness endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::routes::ApiState;

/// Health probe response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Service health check (unauthenticated)
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    let database = match crate::storage::check_connection(state.audit_logs.pool()).await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    Json(HealthResponse { status: "ok", database })
}
