//! User model
//!
//! Defines the User entity and related types. Password-reset state lives on
//! the user row: the token is stored hashed with its expiry, and both are
//! cleared when the reset completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered account. The role decides what it may touch: admins run
/// the site, editors run the newsroom, contributors write their own posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Unique, stored lowercase
    pub email: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// SHA-256 of the outstanding password-reset token, if any
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    /// Expiry of the outstanding reset token
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            role,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Editor or above
    pub fn is_editor(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Editor)
    }

    /// Whether this user may modify a post by the given author.
    /// Editors and admins may edit anything; contributors only their own.
    pub fn can_edit(&self, author_id: i64) -> bool {
        self.is_editor() || self.id == author_id
    }
}

/// Account role, stored as a lowercase string in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    #[default]
    Contributor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Contributor => "contributor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "editor" => Some(UserRole::Editor),
            "contributor" => Some(UserRole::Contributor),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password; hashed by the service before storage
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_permissions() {
        let admin = User::new("a".into(), "a@x".into(), "h".into(), UserRole::Admin);
        let editor = User::new("e".into(), "e@x".into(), "h".into(), UserRole::Editor);
        let mut contrib = User::new("c".into(), "c@x".into(), "h".into(), UserRole::Contributor);
        contrib.id = 7;

        assert!(admin.is_admin() && admin.is_editor());
        assert!(!editor.is_admin() && editor.is_editor());
        assert!(!contrib.is_editor());
        assert!(contrib.can_edit(7));
        assert!(!contrib.can_edit(8));
        assert!(editor.can_edit(8));
    }

    #[test]
    fn role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Editor, UserRole::Contributor] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("superuser"), None);
    }
}
