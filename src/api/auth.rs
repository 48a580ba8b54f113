//! Caller identity.
//!
//! The identity proxy in front of the portal authenticates the user and
//! forwards their principal in `X-Caller-Principal`. A missing header, an empty
//! one and the anonymous principal all mean "not signed in".

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::access::Authentication;
use crate::api::error::ApiError;
use crate::models::Principal;

pub const CALLER_HEADER: &str = "x-caller-principal";

/// Extractor for the caller of the current request
#[derive(Debug, Clone)]
pub struct Caller(pub Authentication);

impl Caller {
    /// The principal to issue backend calls as; anonymous when not signed in.
    pub fn principal(&self) -> Principal {
        self.0.principal().cloned().unwrap_or_else(Principal::anonymous)
    }

    /// For actions that make no sense without an identity
    pub fn require_signed_in(&self) -> Result<Principal, ApiError> {
        self.0
            .principal()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Sign in to continue"))
    }
}

fn parse_caller(parts: &Parts) -> Result<Authentication, ApiError> {
    let Some(value) = parts.headers.get(CALLER_HEADER) else {
        return Ok(Authentication::Anonymous);
    };
    let text = value
        .to_str()
        .map_err(|_| ApiError::validation_field("principal", "Caller principal is not valid text"))?
        .trim();
    if text.is_empty() {
        return Ok(Authentication::Anonymous);
    }
    let principal = Principal::parse(text)?;
    Ok(Authentication::from_principal(Some(principal)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_caller(parts).map(Caller)
    }
}
