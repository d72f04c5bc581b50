//! Identity-adoption middleware.
//!
//! Reads the identity headers set by the upstream authentication proxy and
//! injects [`AuthContext`] and [`RequestMeta`] extensions for handlers and
//! the audit recorder. Requests without a complete identity are rejected.

use axum::{extract::Request, http::header, middleware::Next, response::Response};

use crate::api::error::ApiError;
use crate::audit::RequestMeta;
use crate::auth::models::AuthContext;
use crate::domain::AccessLevel;

/// Header carrying the authenticated operator login.
pub const ACTOR_HEADER: &str = "x-auth-actor";

/// Header carrying the operator's access level tag.
pub const ACCESS_LEVEL_HEADER: &str = "x-auth-level";

pub async fn authenticate(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let headers = request.headers();

    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: missing actor identity"))?;

    let access_level = headers
        .get(ACCESS_LEVEL_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: missing access level"))?
        .parse::<AccessLevel>()
        .map_err(|err| ApiError::unauthorized(format!("Unauthorized: {}", err)))?;

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    request.extensions_mut().insert(AuthContext { actor, access_level });
    request.extensions_mut().insert(RequestMeta { client_ip, user_agent });

    Ok(next.run(request).await)
}
