//! Storage key layout.
//!
//! ```text
//! accum/acc/{name}            accumulator record
//! accum/pos/{name}||{index}   position record
//! ```
//!
//! Names may not contain `|`, so the positions of one accumulator form a
//! single contiguous key range that no other accumulator's keys fall into.

use crate::{AccumError, Result};

/// Separator between accumulator name and owner index.
pub const KEY_SEPARATOR: &str = "||";

/// Prefix of every accumulator record.
pub const ACCUMULATOR_PREFIX: &str = "accum/acc/";

/// Prefix of every position record.
pub const POSITION_PREFIX: &str = "accum/pos/";

/// Check that `name` can be used as an accumulator name.
///
/// # Errors
///
/// - [`AccumError::InvalidName`] if empty or containing `|`
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('|') {
        return Err(AccumError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Check that `index` can be used as an owner index.
///
/// # Errors
///
/// - [`AccumError::InvalidName`] if empty
pub fn validate_index(index: &str) -> Result<()> {
    if index.is_empty() {
        return Err(AccumError::InvalidName(index.to_string()));
    }
    Ok(())
}

/// Key of the accumulator record for `name`.
pub fn accumulator_key(name: &str) -> Vec<u8> {
    format!("{ACCUMULATOR_PREFIX}{name}").into_bytes()
}

/// Prefix shared by every position of accumulator `name`.
pub fn position_prefix(name: &str) -> Vec<u8> {
    format!("{POSITION_PREFIX}{name}{KEY_SEPARATOR}").into_bytes()
}

/// Key of the position record for `(name, index)`.
pub fn position_key(name: &str, index: &str) -> Vec<u8> {
    let mut key = position_prefix(name);
    key.extend_from_slice(index.as_bytes());
    key
}

/// Recover the accumulator name from an accumulator key.
pub fn accumulator_name_from_key(key: &[u8]) -> Option<&str> {
    let rest = key.strip_prefix(ACCUMULATOR_PREFIX.as_bytes())?;
    std::str::from_utf8(rest).ok()
}

/// Recover the owner index from a position key of accumulator `name`.
pub fn position_index_from_key<'k>(name: &str, key: &'k [u8]) -> Option<&'k str> {
    let rest = key.strip_prefix(position_prefix(name).as_slice())?;
    std::str::from_utf8(rest).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(accumulator_key("pool-1"), b"accum/acc/pool-1".to_vec());
        assert_eq!(
            position_key("pool-1", "alice"),
            b"accum/pos/pool-1||alice".to_vec()
        );
    }

    #[test]
    fn test_positions_share_prefix() {
        let prefix = position_prefix("pool-1");
        assert!(position_key("pool-1", "a").starts_with(&prefix));
        assert!(!position_key("pool-10", "a").starts_with(&prefix));
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            accumulator_name_from_key(b"accum/acc/pool-1"),
            Some("pool-1")
        );
        assert_eq!(accumulator_name_from_key(b"accum/pos/pool-1||a"), None);
        let key = position_key("pool-1", "a||b");
        assert_eq!(position_index_from_key("pool-1", &key), Some("a||b"));
    }

    #[test]
    fn test_validate_name() {
        validate_name("pool-1").expect("valid");
        assert!(validate_name("").is_err());
        assert!(validate_name("pool|1").is_err());
        assert!(validate_name("pool||1").is_err());
    }

    #[test]
    fn test_validate_index() {
        validate_index("0").expect("valid");
        let err = validate_index("").expect_err("empty index");
        assert!(matches!(err, AccumError::InvalidName(_)));
    }
}
