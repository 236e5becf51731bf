use serde::{Deserialize, Serialize};

use crate::domain::users::Role;
use crate::error::{AppError, Result};

/// JWT claims embedded in issued session tokens.
///
/// The embedded role is a convenience only; authorization decisions are
/// made against the live user row re-read during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,
    /// Login handle at issuance time
    pub username: String,
    /// Role at issuance time
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// The authenticated identity attached to a request after token validation.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Gate admin-only operations (user management, settings writes,
    /// backup/restore, activity-log reads).
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin role required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: 1,
            username: "tester".to_string(),
            name: "Tester".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(principal(Role::Admin).require_admin().is_ok());
        assert!(matches!(
            principal(Role::Staff).require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
