//! Account roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected user, manager or admin)")]
pub struct RoleParseError(pub String);

/// Role of a storefront account.
///
/// Managers and admins can manage the catalog and shops. Admins can also
/// manage shops they do not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    User,
    /// Catalog and shop manager.
    Manager,
    /// Administrator.
    Admin,
}

impl UserRole {
    /// Whether this role may use the catalog and shop management pages.
    #[must_use]
    pub const fn can_manage(self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }

    /// Whether this role may edit records owned by other accounts.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Label shown next to the username.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Manager => "Manager",
            Self::Admin => "Administrator",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Manager => write!(f, "manager"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_can_manage() {
        assert!(!UserRole::User.can_manage());
        assert!(UserRole::Manager.can_manage());
        assert!(UserRole::Admin.can_manage());
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(!UserRole::Manager.is_admin());
        assert!(UserRole::Admin.is_admin());
    }

    #[test]
    fn test_parse_display_agree() {
        for role in [UserRole::User, UserRole::Manager, UserRole::Admin] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_default_is_user() {
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
