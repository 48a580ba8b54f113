//! User profile and role models.

use serde::{Deserialize, Serialize};

/// Role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    /// Hotel owner
    User,
    Guest,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
            UserRole::Guest => write!(f, "guest"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            "guest" => Ok(UserRole::Guest),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}

/// Whether a hotel owner has redeemed an invite and owns a hotel profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Activated,
    Pending,
}

/// Resolved caller role used by the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "activation", rename_all = "camelCase")]
pub enum CallerRole {
    Admin,
    HotelOwner(Activation),
    Guest,
}

impl CallerRole {
    /// Combine the role lookup, the admin flag and hotel profile presence.
    pub fn resolve(role: UserRole, is_admin: bool, has_hotel: bool) -> Self {
        if is_admin {
            return CallerRole::Admin;
        }
        match role {
            UserRole::Admin => CallerRole::Admin,
            UserRole::User if has_hotel => CallerRole::HotelOwner(Activation::Activated),
            UserRole::User => CallerRole::HotelOwner(Activation::Pending),
            UserRole::Guest => CallerRole::Guest,
        }
    }

    /// The wire role this resolved role corresponds to.
    pub fn user_role(&self) -> UserRole {
        match self {
            CallerRole::Admin => UserRole::Admin,
            CallerRole::HotelOwner(_) => UserRole::User,
            CallerRole::Guest => UserRole::Guest,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, CallerRole::Admin)
    }

    pub fn hotel_activated(&self) -> bool {
        matches!(self, CallerRole::HotelOwner(Activation::Activated))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_admin_flag_wins() {
        assert_eq!(CallerRole::resolve(UserRole::Guest, true, false), CallerRole::Admin);
        assert_eq!(CallerRole::resolve(UserRole::User, true, true), CallerRole::Admin);
        assert_eq!(CallerRole::resolve(UserRole::Admin, false, false), CallerRole::Admin);
    }

    #[test]
    fn test_resolve_hotel_owner_activation() {
        assert_eq!(
            CallerRole::resolve(UserRole::User, false, true),
            CallerRole::HotelOwner(Activation::Activated)
        );
        assert_eq!(
            CallerRole::resolve(UserRole::User, false, false),
            CallerRole::HotelOwner(Activation::Pending)
        );
        assert_eq!(CallerRole::resolve(UserRole::Guest, false, true), CallerRole::Guest);
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&UserRole::User).unwrap(), "\"user\"");
        assert_eq!("ADMIN".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("owner".parse::<UserRole>().is_err());
    }
}
