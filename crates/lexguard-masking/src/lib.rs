//! Masking rule registry.
//!
//! Stores the keyword and regex rules an external redaction engine applies
//! to court documents. The registry validates rules at write time and never
//! matches text itself; the engine reads the active set through
//! [`RuleSource`].
//!
//! A regex rule is compiled once on every write. A pattern that does not
//! compile is rejected before it reaches the registry, so the engine never
//! sees a broken rule.
//!
//! ```
//! use chrono::Utc;
//! use lexguard_masking::{MaskingRuleRegistry, NewMaskingRule, RuleCategory, RuleLanguage, RuleSource};
//! use lexguard_types::PrincipalId;
//!
//! let mut registry = MaskingRuleRegistry::new();
//! let rule = NewMaskingRule::regex(r"\d{2,8}-\d{4}-\d{7}", RuleLanguage::Both, RuleCategory::Personal);
//! let id = registry.add_rule(rule, &PrincipalId::new("u-1"), Utc::now()).unwrap();
//!
//! assert_eq!(registry.active_rules()[0].id, id);
//! ```

use lexguard_types::RuleId;
use thiserror::Error;

pub mod registry;
pub mod rule;
pub mod validate;

pub use registry::{MaskingRuleRegistry, RuleFilter, RuleSource};
pub use rule::{MaskingRule, NewMaskingRule, RuleCategory, RuleLanguage, RulePatch};
pub use validate::{MAX_PATTERN_LENGTH, validate_pattern};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Masking rule pattern is empty")]
    EmptyPattern,

    #[error("Masking rule pattern is {len} bytes, maximum is {max}")]
    PatternTooLong { len: usize, max: usize },

    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Rule '{pattern}' for language {language} already exists as {existing}")]
    Duplicate {
        pattern: String,
        language: RuleLanguage,
        existing: RuleId,
    },

    #[error("Masking rule {0} not found")]
    RuleNotFound(RuleId),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
