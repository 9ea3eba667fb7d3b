//! Denomination validation.
//!
//! A denomination is 3 to 128 characters long, starts with an ASCII letter
//! and continues with ASCII alphanumerics or one of `/ : . _ -`.

use crate::{Result, TypesError};

/// Minimum denomination length.
pub const MIN_DENOM_LEN: usize = 3;

/// Maximum denomination length.
pub const MAX_DENOM_LEN: usize = 128;

/// Validate a denomination string.
///
/// # Errors
///
/// - [`TypesError::InvalidDenom`] if the string does not match the format
pub fn validate_denom(denom: &str) -> Result<()> {
    let len = denom.len();
    if !(MIN_DENOM_LEN..=MAX_DENOM_LEN).contains(&len) {
        return Err(TypesError::InvalidDenom(denom.to_string()));
    }

    let mut chars = denom.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(is_denom_char);

    if starts_with_letter && rest_ok {
        Ok(())
    } else {
        Err(TypesError::InvalidDenom(denom.to_string()))
    }
}

fn is_denom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_denoms() {
        for denom in [
            "uusdc",
            "uosmo",
            "ibc/27394FB092D2ECCD",
            "gamm/pool/1",
            "factory:a.b_c-d",
        ] {
            validate_denom(denom).expect(denom);
        }
    }

    #[test]
    fn test_too_short() {
        let err = validate_denom("ab").expect_err("too short");
        assert!(matches!(err, TypesError::InvalidDenom(_)));
    }

    #[test]
    fn test_too_long() {
        let denom = format!("u{}", "a".repeat(MAX_DENOM_LEN));
        assert!(validate_denom(&denom).is_err());
    }

    #[test]
    fn test_must_start_with_letter() {
        assert!(validate_denom("1usdc").is_err());
        assert!(validate_denom("/usdc").is_err());
    }

    #[test]
    fn test_rejects_whitespace() {
        assert!(validate_denom("u usdc").is_err());
    }
}
