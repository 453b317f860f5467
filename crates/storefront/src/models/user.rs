//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId, UserRole, Username};

/// A registered account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Contact email.
    pub email: Email,
    /// What the account may do.
    pub role: UserRole,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// `username (Role)`, as shown on the profile page.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} ({})", self.username, self.role.label())
    }
}

/// Data for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
}
