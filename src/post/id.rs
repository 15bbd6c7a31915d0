//! Post identifiers.
//!
//! An id is either supplied by the caller or built as `{topic}-{unix_millis}`.
//! Ids become a key segment (`posts/{id}/`), so both ids and topic tokens
//! must be a single safe path segment.

use chrono::{DateTime, Utc};

use crate::constants::MAX_ID_LEN;
use crate::error::{Error, Result};

/// Builds an id from a topic token and the creation time.
pub fn generate_id(topic_id: &str, now: DateTime<Utc>) -> String {
    format!("{topic_id}-{}", now.timestamp_millis())
}

/// Checks that `value` can be used as a key segment.
///
/// # Errors
///
/// Returns a validation error naming `field` if the value is empty, too long,
/// `.`/`..`, or contains a slash, backslash, or control character.
pub fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(Error::validation(format!(
            "{field} is too long ({} bytes, max {MAX_ID_LEN})",
            value.len()
        )));
    }
    if value == "." || value == ".." {
        return Err(Error::validation(format!("{field} cannot be '{value}'")));
    }
    if value.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(Error::validation(format!(
            "{field} cannot contain slashes or control characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_id_uses_millis() {
        let now = Utc.timestamp_millis_opt(1_740_821_400_123).unwrap();
        assert_eq!(generate_id("face-reading", now), "face-reading-1740821400123");
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("id", "face-reading-1").is_ok());
        assert!(validate_segment("id", "관상-1").is_ok());

        for bad in ["", "  ", ".", "..", "a/b", "a\\b", "a\nb"] {
            assert!(
                matches!(validate_segment("id", bad), Err(Error::Validation(_))),
                "accepted {bad:?}"
            );
        }
        assert!(validate_segment("id", &"x".repeat(MAX_ID_LEN + 1)).is_err());
    }
}
