//! Naming rules for handles (element, field and id-attribute names), item
//! identifiers and condition values.

use qscope_common::{Result, error::Error};

/// Bytes with a structural meaning in restriction and content strings.
pub const RESERVED: &[char] = &['^', '|', '.', '~'];

/// A handle is a non-empty run of ASCII letters, digits and underscores.
pub fn is_handle(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A condition value is non-empty and free of reserved bytes and whitespace.
pub fn is_condition_value(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| RESERVED.contains(&c) || c.is_whitespace())
}

pub fn verify_handle(what: &str, s: &str) -> Result<()> {
    if is_handle(s) {
        Ok(())
    } else {
        Err(Error::invalid_arg(what, format!("'{s}' is not a valid handle")))
    }
}

/// Validates an identifier destined for a subcorpus item list.
pub fn verify_item_id(id: &str, max_len: usize) -> Result<()> {
    if !is_handle(id) {
        return Err(Error::invalid_arg(
            "item id",
            format!("'{id}' may only contain ASCII letters, digits and underscores"),
        ));
    }
    if id.len() > max_len {
        return Err(Error::invalid_arg(
            "item id",
            format!("'{id}' is longer than {max_len} bytes"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles() {
        assert!(is_handle("text_id"));
        assert!(is_handle("U2"));
        assert!(!is_handle(""));
        assert!(!is_handle("a-b"));
        assert!(!is_handle("a b"));
        assert!(!is_handle("é"));
    }

    #[test]
    fn test_values() {
        assert!(is_condition_value("fiction"));
        assert!(is_condition_value("1990-1999"));
        assert!(!is_condition_value("a.b"));
        assert!(!is_condition_value("a~b"));
        assert!(!is_condition_value("two words"));
        assert!(!is_condition_value(""));
    }

    #[test]
    fn test_item_ids() {
        assert!(verify_item_id("A01", 255).is_ok());
        assert!(verify_item_id("A-01", 255).is_err());
        assert!(verify_item_id("ABCDE", 4).is_err());
    }
}
