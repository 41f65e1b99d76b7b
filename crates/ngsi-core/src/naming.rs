//! FIWARE-safe naming policy
//!
//! Ids, types and names travel in URLs and headers, so the Context Broker
//! restricts them to printable ASCII without `&`, `?`, `/` and `#`.
//! Attribute and command names are additionally barred from containing `:`
//! and from being one of the reserved tokens `id` / `type`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{NgsiError, NgsiResult};

/// Maximum length of any id, type or name
pub const MAX_NAME_LENGTH: usize = 256;

/// Tokens that can never be used as attribute or command names
pub const RESERVED_NAMES: &[&str] = &["id", "type"];

const STANDARD_PATTERN: &str = r"^[\x21\x22\x24\x25\x27-\x2E\x30-\x3E\x40-\x7E]+$";
const PROTECTED_PATTERN: &str = r"^[\x21\x22\x24\x25\x27-\x2E\x30-\x39\x3B-\x3E\x40-\x7E]+$";

fn standard_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STANDARD_PATTERN).expect("standard pattern compiles"))
}

fn protected_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PROTECTED_PATTERN).expect("protected pattern compiles"))
}

/// Which character policy a field is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePolicy {
    /// Ids, types, metadata names
    Standard,
    /// Attribute and command names
    Protected,
}

impl NamePolicy {
    /// The regular expression (without length bound) for this policy
    pub fn pattern(&self) -> &'static str {
        match self {
            NamePolicy::Standard => STANDARD_PATTERN,
            NamePolicy::Protected => PROTECTED_PATTERN,
        }
    }

    /// Check a candidate string against this policy
    pub fn is_valid(&self, value: &str) -> bool {
        self.violation(value).is_none()
    }

    /// Validate `value` for the named `field`
    pub fn validate(&self, field: &str, value: &str) -> NgsiResult<()> {
        match self.violation(value) {
            None => Ok(()),
            Some(reason) => Err(NgsiError::format(field, value, reason)),
        }
    }

    fn violation(&self, value: &str) -> Option<String> {
        let length = value.chars().count();
        if length == 0 {
            return Some("must not be empty".to_string());
        }
        if length > MAX_NAME_LENGTH {
            return Some(format!(
                "exceeds {} characters ({})",
                MAX_NAME_LENGTH, length
            ));
        }

        let regex = match self {
            NamePolicy::Standard => standard_regex(),
            NamePolicy::Protected => protected_regex(),
        };
        if !regex.is_match(value) {
            let offending = value
                .chars()
                .find(|c| !self.allows(*c))
                .map(describe_char)
                .unwrap_or_else(|| "disallowed character".to_string());
            return Some(format!("contains {}", offending));
        }

        if *self == NamePolicy::Protected && RESERVED_NAMES.contains(&value) {
            return Some("is a reserved name".to_string());
        }
        None
    }

    fn allows(&self, c: char) -> bool {
        let printable = c.is_ascii_graphic();
        let forbidden = matches!(c, '&' | '?' | '/' | '#')
            || (*self == NamePolicy::Protected && c == ':');
        printable && !forbidden
    }
}

fn describe_char(c: char) -> String {
    if c.is_whitespace() {
        "whitespace".to_string()
    } else if c.is_control() {
        format!("control character U+{:04X}", c as u32)
    } else if !c.is_ascii() {
        format!("non-ASCII character '{}'", c)
    } else {
        format!("'{}'", c)
    }
}

/// Validate an id, type or metadata name
pub fn validate_standard(field: &str, value: &str) -> NgsiResult<()> {
    NamePolicy::Standard.validate(field, value)
}

/// Validate an attribute or command name
pub fn validate_protected(field: &str, value: &str) -> NgsiResult<()> {
    NamePolicy::Protected.validate(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const VALID: &[&str] = &["name", "test123", "3_:strange-Name!"];
    const INVALID: &[&str] = &["my name", "Test?", "#False", "/notvalid", "a&b", "tab\tbed", ""];
    const SPECIAL: &[&str] = &["id", "type", "geo:location"];

    #[test]
    fn test_standard_policy() {
        for s in VALID.iter().chain(SPECIAL) {
            assert!(NamePolicy::Standard.is_valid(s), "{s} should be valid");
        }
        for s in INVALID {
            assert!(!NamePolicy::Standard.is_valid(s), "{s} should be invalid");
        }
    }

    #[test]
    fn test_protected_policy() {
        assert!(NamePolicy::Protected.is_valid("name"));
        assert!(NamePolicy::Protected.is_valid("test123"));
        for s in INVALID.iter().chain(SPECIAL) {
            assert!(!NamePolicy::Protected.is_valid(s), "{s} should be invalid");
        }
        // reserved tokens only match exactly
        assert!(NamePolicy::Protected.is_valid("identifier"));
        assert!(NamePolicy::Protected.is_valid("Type"));
    }

    #[test]
    fn test_length_bounds() {
        let max = "a".repeat(MAX_NAME_LENGTH);
        let too_long = "a".repeat(MAX_NAME_LENGTH + 1);

        assert!(validate_standard("entity id", &max).is_ok());
        assert!(validate_protected("attribute name", &max).is_ok());

        let err = validate_standard("entity id", &too_long).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("exceeds 256 characters (257)"));
        let err = validate_protected("attribute name", &too_long).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_control_characters_rejected() {
        for s in ["a\u{1}b", "\u{0}", "end\u{7f}", "line\nbreak", "\u{1b}[0m"] {
            let err = validate_standard("entity id", s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{s:?}");
            let err = validate_protected("attribute name", s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{s:?}");
        }
        let err = validate_standard("entity id", "a\u{1}b").unwrap_err();
        assert!(err.to_string().contains("control character U+0001"));
        let err = validate_protected("attribute name", "end\u{7f}").unwrap_err();
        assert!(err.to_string().contains("control character U+007F"));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(!NamePolicy::Standard.is_valid("temperatur°"));
        let err = validate_standard("type", "Zähler").unwrap_err();
        assert!(err.to_string().contains("non-ASCII"));
    }

    #[test]
    fn test_error_names_field() {
        let err = validate_protected("attribute name", "geo:location").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid attribute name 'geo:location': contains ':'"
        );
        let err = validate_protected("attribute name", "id").unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }
}
