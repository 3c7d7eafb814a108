use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role string stored on the user row for admin accounts
pub const ROLE_ADMIN: &str = "admin";

/// Status string for accounts allowed to use the service
pub const STATUS_ACTIVE: &str = "active";

/// A registered user
///
/// Account creation and authentication happen upstream; this service only
/// needs existence, active status, and the admin quota exemption.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Admins are exempt from the daily recommendation quota
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Only active accounts may write; deleted accounts look like missing ones
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: &str, status: &str) -> User {
        User {
            user_id: 1,
            email: "test@example.com".to_string(),
            display_name: "Test".to_string(),
            role: role.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(user_with("admin", "active").is_admin());
        assert!(!user_with("user", "active").is_admin());
    }

    #[test]
    fn test_is_active() {
        assert!(user_with("user", "active").is_active());
        assert!(!user_with("user", "deleted").is_active());
    }
}
