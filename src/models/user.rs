//! User model
//!
//! Staff accounts for the admin dashboard. Admins manage other users;
//! editors manage content and the lead pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Staff user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user. The password must already be hashed.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username,
            email,
            password_hash,
            display_name: None,
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

string_enum! {
    /// User role for authorization
    pub enum UserRole {
        /// Full access, including user management
        Admin => "admin",
        /// Content and pipeline management
        Editor => "editor",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Editor
    }
}

string_enum! {
    /// Account state. Disabled users cannot log in.
    pub enum UserStatus {
        Active => "active",
        Disabled => "disabled",
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Input for creating a user from the admin dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

/// Partial update of a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    /// New password (plain text, hashed by the service)
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("EDITOR").unwrap(), UserRole::Editor);
        assert!(UserRole::from_str("author").is_err());
        assert_eq!(UserRole::default(), UserRole::Editor);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "partner".to_string(),
            "partner@firm.example".to_string(),
            "secret-hash".to_string(),
            UserRole::Admin,
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["status"], "active");
    }
}
