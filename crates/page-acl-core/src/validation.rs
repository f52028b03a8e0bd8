//! Parsing of raw identifiers handed in by callers.
//!
//! Form values arrive as strings. An identifier is accepted only if it is
//! the canonical decimal rendering of an integer: no sign, no leading
//! zeros, no surrounding whitespace.

use crate::error::ValidationError;
use crate::types::{AclEntryId, PageId};

/// Parse a raw ACL entry id.
///
/// A missing, empty or zero id is [`ValidationError::MissingEntryId`];
/// anything that is not a canonical integer is
/// [`ValidationError::InvalidEntryId`].
pub fn parse_entry_id(raw: Option<&str>) -> Result<AclEntryId, ValidationError> {
    let raw = match raw {
        None | Some("") | Some("0") => return Err(ValidationError::MissingEntryId),
        Some(raw) => raw,
    };

    parse_canonical_u64(raw)
        .map(AclEntryId)
        .ok_or_else(|| ValidationError::InvalidEntryId(raw.to_string()))
}

/// Parse a raw page id, which must be a positive canonical integer.
pub fn parse_page_id(raw: Option<&str>) -> Result<PageId, ValidationError> {
    let raw = raw.unwrap_or_default();
    match parse_canonical_u64(raw) {
        Some(id) if id > 0 => Ok(PageId(id)),
        _ => Err(ValidationError::InvalidPageId(raw.to_string())),
    }
}

fn parse_canonical_u64(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_entry_id() {
        assert_eq!(parse_entry_id(None), Err(ValidationError::MissingEntryId));
        assert_eq!(parse_entry_id(Some("")), Err(ValidationError::MissingEntryId));
        assert_eq!(parse_entry_id(Some("0")), Err(ValidationError::MissingEntryId));
    }

    #[test]
    fn test_non_numeric_entry_id() {
        for raw in ["abc", "12a", " 12", "12 ", "-3", "+3", "007", "1.5", "1e3"] {
            assert_eq!(
                parse_entry_id(Some(raw)),
                Err(ValidationError::InvalidEntryId(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_entry_id_overflow_rejected() {
        let raw = "18446744073709551616";
        assert!(matches!(
            parse_entry_id(Some(raw)),
            Err(ValidationError::InvalidEntryId(_))
        ));
    }

    #[test]
    fn test_valid_entry_id() {
        assert_eq!(parse_entry_id(Some("42")), Ok(AclEntryId(42)));
    }

    #[test]
    fn test_page_id() {
        assert_eq!(parse_page_id(Some("3")), Ok(PageId(3)));
        assert!(parse_page_id(Some("0")).is_err());
        assert!(parse_page_id(None).is_err());
    }

    proptest! {
        #[test]
        fn test_any_positive_id_parses(id in 1u64..=u64::MAX) {
            let raw = id.to_string();
            prop_assert_eq!(parse_entry_id(Some(&raw)), Ok(AclEntryId(id)));
        }
    }
}
