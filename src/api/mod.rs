//! # HTTP API
//!
//! Axum-based HTTP surface: credential CRUD, the audit query/export
//! endpoints and the administrative key migration endpoint.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, build_state, ApiState};
pub use server::start_api_server;
