//! Pattern validation.

use regex::RegexBuilder;

use crate::{Result, ValidationError};

/// Maximum accepted pattern length in bytes.
pub const MAX_PATTERN_LENGTH: usize = 1024;

/// Compiled program size limit for regex rules.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Checks that `pattern` is non-empty, bounded, and compiles when `is_regex`.
pub fn validate_pattern(pattern: &str, is_regex: bool) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(ValidationError::EmptyPattern);
    }
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(ValidationError::PatternTooLong {
            len: pattern.len(),
            max: MAX_PATTERN_LENGTH,
        });
    }
    if is_regex {
        RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| ValidationError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("رقم الهوية", false => true; "arabic keyword")]
    #[test_case("Social Security", false => true; "english keyword")]
    #[test_case(r"\d{2,8}\-\d{4}\-\d{7}", true => true; "national id regex")]
    #[test_case("(unclosed", true => false; "unbalanced parenthesis")]
    #[test_case("(unclosed", false => true; "unbalanced parenthesis as keyword")]
    #[test_case("[a-", true => false; "unterminated class")]
    #[test_case("", false => false; "empty")]
    #[test_case("   ", true => false; "whitespace only")]
    fn pattern_validity(pattern: &str, is_regex: bool) -> bool {
        validate_pattern(pattern, is_regex).is_ok()
    }

    #[test]
    fn empty_pattern_error_kind() {
        assert_eq!(validate_pattern("", true), Err(ValidationError::EmptyPattern));
    }

    #[test]
    fn overlong_pattern_is_rejected() {
        let pattern = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(matches!(
            validate_pattern(&pattern, false),
            Err(ValidationError::PatternTooLong { .. })
        ));
    }

    #[test]
    fn regex_error_carries_reason() {
        match validate_pattern("(unclosed", true) {
            Err(ValidationError::InvalidRegex { pattern, reason }) => {
                assert_eq!(pattern, "(unclosed");
                assert!(!reason.is_empty());
            }
            other => panic!("expected InvalidRegex, got {other:?}"),
        }
    }
}
