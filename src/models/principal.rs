//! Caller identities as they cross the backend boundary.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Textual principal: base32 groups of up to five characters joined by dashes
    static ref PRINCIPAL_REGEX: Regex = Regex::new(r"^[a-z2-7]{1,5}(-[a-z2-7]{1,5})*$").unwrap();
}

/// Text form of the anonymous identity.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

const MAX_PRINCIPAL_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    #[error("Principal is required")]
    Empty,
    #[error("Principal is too long (max {MAX_PRINCIPAL_LEN} characters)")]
    TooLong,
    #[error("Invalid principal format: {0}")]
    Malformed(String),
}

/// Opaque principal id. Only the text format is checked here; the backend
/// owns what an identity is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn parse(text: &str) -> Result<Self, PrincipalError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrincipalError::Empty);
        }
        if text.len() > MAX_PRINCIPAL_LEN {
            return Err(PrincipalError::TooLong);
        }
        if !PRINCIPAL_REGEX.is_match(text) {
            return Err(PrincipalError::Malformed(text.to_string()));
        }
        Ok(Self(text.to_string()))
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_PRINCIPAL.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_PRINCIPAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}
