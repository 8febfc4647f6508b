//! Platform roles

use serde::{Deserialize, Serialize};

/// Role attribute stored on a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    Master,
    Admin,
    Staff,
    User,
}

impl PlatformRole {
    /// Parse a stored role; anything unrecognised is a plain user
    pub fn parse(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "master" => PlatformRole::Master,
            "admin" => PlatformRole::Admin,
            "staff" => PlatformRole::Staff,
            _ => PlatformRole::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::Master => "master",
            PlatformRole::Admin => "admin",
            PlatformRole::Staff => "staff",
            PlatformRole::User => "user",
        }
    }

    /// Only admins and masters may run MRR reports and quantity syncs
    pub fn can_manage_billing(&self) -> bool {
        matches!(self, PlatformRole::Master | PlatformRole::Admin)
    }
}

impl std::fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!(PlatformRole::parse("master"), PlatformRole::Master);
        assert_eq!(PlatformRole::parse("admin"), PlatformRole::Admin);
        assert_eq!(PlatformRole::parse("staff"), PlatformRole::Staff);
        assert_eq!(PlatformRole::parse("user"), PlatformRole::User);
    }

    #[test]
    fn test_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(PlatformRole::parse(" Admin "), PlatformRole::Admin);
        assert_eq!(PlatformRole::parse("MASTER"), PlatformRole::Master);
    }

    #[test]
    fn test_unknown_role_is_user() {
        assert_eq!(PlatformRole::parse("superuser"), PlatformRole::User);
        assert_eq!(PlatformRole::parse(""), PlatformRole::User);
    }

    #[test]
    fn test_billing_permissions() {
        assert!(PlatformRole::Master.can_manage_billing());
        assert!(PlatformRole::Admin.can_manage_billing());
        assert!(!PlatformRole::Staff.can_manage_billing());
        assert!(!PlatformRole::User.can_manage_billing());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&PlatformRole::Master).unwrap();
        assert_eq!(json, "\"master\"");
    }
}
