//! Role and activation gate for portal routes.

use serde::Serialize;

use crate::models::{Activation, CallerRole, Principal, UserRole};

/// Who is calling, as far as the identity proxy is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Anonymous,
    Authenticated(Principal),
}

impl Authentication {
    pub fn from_principal(principal: Option<Principal>) -> Self {
        match principal {
            Some(p) if !p.is_anonymous() => Authentication::Authenticated(p),
            _ => Authentication::Anonymous,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Authentication::Anonymous => None,
            Authentication::Authenticated(p) => Some(p),
        }
    }
}

/// Requirements a route places on its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    pub required: &'static [UserRole],
    pub require_hotel_activation: bool,
}

impl RouteGuard {
    pub const fn roles(required: &'static [UserRole]) -> Self {
        Self {
            required,
            require_hotel_activation: false,
        }
    }

    pub const fn with_hotel_activation(mut self) -> Self {
        self.require_hotel_activation = true;
        self
    }
}

/// Outcome of the gate. Everything except `Allow` is rendered instead of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum GateDecision {
    Allow,
    LoginRequired,
    /// The role lookup itself failed
    #[serde(rename_all = "camelCase")]
    PermissionCheckFailed {
        message: String,
        retry_path: &'static str,
        home_path: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Denied { required_roles: Vec<UserRole> },
    /// Right role, no hotel yet: show the invite-token form instead of a dead end
    #[serde(rename_all = "camelCase")]
    ActivationRequired {
        validate_path: &'static str,
        consume_path: &'static str,
    },
}

impl GateDecision {
    /// Recoverable screen for a failed role lookup: retry, or go home.
    pub fn permission_check_failed(error: impl std::fmt::Display) -> Self {
        GateDecision::PermissionCheckFailed {
            message: error.to_string(),
            retry_path: RETRY_PERMISSIONS_PATH,
            home_path: Route::Home.path(),
        }
    }
}

pub const RETRY_PERMISSIONS_PATH: &str = "/api/session/retry-permissions";
pub const VALIDATE_TOKEN_PATH: &str = "/api/invite-tokens/validate";
pub const CONSUME_TOKEN_PATH: &str = "/api/invite-tokens/consume";

pub fn evaluate<E: std::fmt::Display>(
    auth: &Authentication,
    lookup: Result<CallerRole, E>,
    guard: &RouteGuard,
) -> GateDecision {
    if matches!(auth, Authentication::Anonymous) {
        return GateDecision::LoginRequired;
    }

    let role = match lookup {
        Ok(role) => role,
        Err(e) => return GateDecision::permission_check_failed(e),
    };

    let activation = match role {
        CallerRole::Admin => return GateDecision::Allow,
        CallerRole::HotelOwner(activation) => Some(activation),
        CallerRole::Guest => None,
    };

    if !guard.required.contains(&role.user_role()) {
        return GateDecision::Denied {
            required_roles: guard.required.to_vec(),
        };
    }

    if guard.require_hotel_activation && activation != Some(Activation::Activated) {
        return GateDecision::ActivationRequired {
            validate_path: VALIDATE_TOKEN_PATH,
            consume_path: CONSUME_TOKEN_PATH,
        };
    }

    GateDecision::Allow
}

/// Client-side route surface of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Browse,
    HotelDetail,
    Bookings,
    Guest,
    Account,
    AccountStatus,
    Hotel,
    Admin,
}

const HOTEL_ROLES: &[UserRole] = &[UserRole::User, UserRole::Admin];
const ADMIN_ROLES: &[UserRole] = &[UserRole::Admin];

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Home,
        Route::Browse,
        Route::HotelDetail,
        Route::Bookings,
        Route::Guest,
        Route::Account,
        Route::AccountStatus,
        Route::Hotel,
        Route::Admin,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Browse => "/browse",
            Route::HotelDetail => "/browse/:hotelId",
            Route::Bookings => "/bookings",
            Route::Guest => "/guest",
            Route::Account => "/account",
            Route::AccountStatus => "/account-status",
            Route::Hotel => "/hotel",
            Route::Admin => "/admin",
        }
    }

    /// `None` for public routes.
    pub fn guard(&self) -> Option<RouteGuard> {
        match self {
            Route::Hotel => Some(RouteGuard::roles(HOTEL_ROLES).with_hotel_activation()),
            Route::Admin => Some(RouteGuard::roles(ADMIN_ROLES)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> Authentication {
        Authentication::Authenticated(Principal::parse("bbbbb-bb").unwrap())
    }

    fn ok(role: CallerRole) -> Result<CallerRole, String> {
        Ok(role)
    }

    fn pending_owner() -> CallerRole {
        CallerRole::HotelOwner(Activation::Pending)
    }

    #[test]
    fn test_anonymous_gets_login_prompt() {
        let decision = evaluate(
            &Authentication::Anonymous,
            ok(CallerRole::Admin),
            &RouteGuard::roles(ADMIN_ROLES),
        );
        assert_eq!(decision, GateDecision::LoginRequired);
    }

    #[test]
    fn test_anonymous_principal_is_not_authenticated() {
        assert_eq!(
            Authentication::from_principal(Some(Principal::anonymous())),
            Authentication::Anonymous
        );
    }

    #[test]
    fn test_lookup_failure_is_recoverable_screen() {
        let decision = evaluate(
            &signed_in(),
            Err::<CallerRole, _>("backend unavailable"),
            &RouteGuard::roles(ADMIN_ROLES),
        );
        match decision {
            GateDecision::PermissionCheckFailed { message, retry_path, home_path } => {
                assert_eq!(message, "backend unavailable");
                assert_eq!(retry_path, RETRY_PERMISSIONS_PATH);
                assert_eq!(home_path, "/");
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_guest_denied_admin_route() {
        let guard = RouteGuard::roles(ADMIN_ROLES);
        let decision = evaluate(&signed_in(), ok(CallerRole::Guest), &guard);
        assert_eq!(
            decision,
            GateDecision::Denied {
                required_roles: vec![UserRole::Admin]
            }
        );
    }

    #[test]
    fn test_admin_bypasses_everything() {
        let guard = RouteGuard::roles(&[UserRole::User]).with_hotel_activation();
        assert_eq!(evaluate(&signed_in(), ok(CallerRole::Admin), &guard), GateDecision::Allow);
        assert_eq!(
            evaluate(&signed_in(), ok(CallerRole::Admin), &RouteGuard::roles(ADMIN_ROLES)),
            GateDecision::Allow
        );
    }

    #[test]
    fn test_pending_owner_gets_activation_form() {
        let guard = RouteGuard::roles(&[UserRole::User]).with_hotel_activation();
        let decision = evaluate(&signed_in(), ok(pending_owner()), &guard);
        assert!(matches!(decision, GateDecision::ActivationRequired { .. }));

        let activated = CallerRole::HotelOwner(Activation::Activated);
        let decision = evaluate(&signed_in(), ok(activated), &guard);
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn test_activation_not_required_allows_pending_owner() {
        let guard = RouteGuard::roles(&[UserRole::User]);
        let decision = evaluate(&signed_in(), ok(pending_owner()), &guard);
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn test_route_guards() {
        assert!(Route::Home.guard().is_none());
        assert!(Route::Browse.guard().is_none());
        let hotel = Route::Hotel.guard().unwrap();
        assert!(hotel.require_hotel_activation);
        assert_eq!(hotel.required, HOTEL_ROLES);
        let admin = Route::Admin.guard().unwrap();
        assert!(!admin.require_hotel_activation);
        assert_eq!(admin.required, ADMIN_ROLES);
    }

    #[test]
    fn test_gate_view_serialization() {
        let json = serde_json::to_value(GateDecision::Denied {
            required_roles: vec![UserRole::Admin],
        })
        .unwrap();
        assert_eq!(json["view"], "denied");
        assert_eq!(json["requiredRoles"][0], "admin");
    }
}
