//! Access-level guards for handlers.

use crate::api::error::ApiError;
use crate::auth::models::AuthContext;

/// Require the administrator access level.
pub fn require_admin(context: &AuthContext) -> Result<(), ApiError> {
    if context.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Forbidden: administrator access required"))
    }
}
