//! Request-scoped identity models.

use crate::domain::AccessLevel;

/// Identity adopted from the upstream authentication layer, attached to
/// every request as an extension.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Operator login name
    pub actor: String,
    /// Access level tag at request time
    pub access_level: AccessLevel,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.access_level.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_admin() {
        let admin = AuthContext { actor: "carla".into(), access_level: AccessLevel::Admin };
        let operator = AuthContext { actor: "bruno".into(), access_level: AccessLevel::Operator };
        assert!(admin.is_admin());
        assert!(!operator.is_admin());
    }
}
