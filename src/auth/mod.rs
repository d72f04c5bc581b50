//! # Request Authentication Context
//!
//! This service runs behind an already-authenticated proxy that supplies
//! the actor identity and access level of every request. This module only
//! adopts that context — it implements no authentication or authorization
//! policy of its own, and it fails closed when the identity headers are
//! absent.

pub mod authorization;
pub mod middleware;
pub mod models;

pub use authorization::require_admin;
pub use middleware::authenticate;
pub use models::AuthContext;
