//! Invite tokens used to activate hotel owners.

use serde::{Deserialize, Serialize};

use super::Principal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteToken {
    pub token: String,
    pub issued_by: Principal,
    pub max_uses: u32,
    pub usage_count: u32,
    /// Restricts redemption to a single hotel-owner identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_principal: Option<Principal>,
    pub active: bool,
    pub created_at: u64,
}

/// Why a token cannot be redeemed by a given caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("Invite token has already been used the maximum number of times")]
    Exhausted,
    #[error("Invite token is no longer active")]
    Inactive,
    #[error("Invite token is bound to a different account")]
    BoundToOther,
}

impl InviteToken {
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.usage_count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_count >= self.max_uses
    }

    pub fn redeemable_by(&self, caller: &Principal) -> Result<(), TokenRejection> {
        if self.is_exhausted() {
            return Err(TokenRejection::Exhausted);
        }
        if !self.active {
            return Err(TokenRejection::Inactive);
        }
        match &self.bound_principal {
            Some(bound) if bound != caller => Err(TokenRejection::BoundToOther),
            _ => Ok(()),
        }
    }

    /// Count one use; the token deactivates once it reaches `max_uses`.
    pub fn record_use(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
        if self.is_exhausted() {
            self.active = false;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteTokenRequest {
    pub max_uses: u32,
    #[serde(default)]
    pub bound_principal: Option<Principal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(max_uses: u32, usage_count: u32, bound: Option<&str>) -> InviteToken {
        InviteToken {
            token: "tok".to_string(),
            issued_by: Principal::parse("aaaaa-aa").unwrap(),
            max_uses,
            usage_count,
            bound_principal: bound.map(|b| Principal::parse(b).unwrap()),
            active: usage_count < max_uses,
            created_at: 0,
        }
    }

    #[test]
    fn test_exhausted_token_is_rejected() {
        let caller = Principal::parse("bbbbb-bb").unwrap();
        let t = token(2, 2, None);
        assert_eq!(t.remaining_uses(), 0);
        assert_eq!(t.redeemable_by(&caller), Err(TokenRejection::Exhausted));
    }

    #[test]
    fn test_bound_token_only_for_bound_principal() {
        let t = token(1, 0, Some("bbbbb-bb"));
        assert!(t.redeemable_by(&Principal::parse("bbbbb-bb").unwrap()).is_ok());
        assert_eq!(
            t.redeemable_by(&Principal::parse("ccccc-cc").unwrap()),
            Err(TokenRejection::BoundToOther)
        );
    }

    #[test]
    fn test_record_use_deactivates_at_limit() {
        let mut t = token(2, 0, None);
        t.record_use();
        assert!(t.active);
        assert_eq!(t.remaining_uses(), 1);
        t.record_use();
        assert!(!t.active);
        assert!(t.is_exhausted());
    }
}
