//! Invite-token format checks.
//!
//! Only the shape of a token is checked here, for inline feedback before a
//! redemption is attempted. Whether a token is usable is for the backend to say.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{16,64}$").unwrap();
}

pub const MIN_TOKEN_LEN: usize = 16;
pub const MAX_TOKEN_LEN: usize = 64;

/// Generate a token in the format `validate_token_format` accepts.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn validate_token_format(token: &str) -> Result<(), String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Invite token is required".to_string());
    }
    if token.len() < MIN_TOKEN_LEN {
        return Err(format!(
            "Invite token is too short (min {} characters)",
            MIN_TOKEN_LEN
        ));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(format!(
            "Invite token is too long (max {} characters)",
            MAX_TOKEN_LEN
        ));
    }
    if !TOKEN_REGEX.is_match(token) {
        return Err(
            "Invite token may only contain letters, digits, dashes and underscores".to_string(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_well_formed() {
        for _ in 0..10 {
            assert!(validate_token_format(&generate_token()).is_ok());
        }
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(validate_token_format("").is_err());
        assert!(validate_token_format("   ").is_err());
        assert!(validate_token_format("short").is_err());
        assert!(validate_token_format(&"a".repeat(65)).is_err());
        assert!(validate_token_format("has spaces in the middle!").is_err());
    }

    #[test]
    fn test_accepts_surrounding_whitespace() {
        assert!(validate_token_format("  0123456789abcdef_-XYZ  ").is_ok());
    }
}
