//! Masking rule model.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lexguard_types::{Language, PrincipalId, RuleId, TypeError};
use serde::{Deserialize, Serialize};

/// Document language a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLanguage {
    Arabic,
    English,
    Both,
}

impl RuleLanguage {
    /// Returns whether documents in `language` are covered by this rule.
    pub fn covers(&self, language: Language) -> bool {
        match self {
            RuleLanguage::Both => true,
            RuleLanguage::Arabic => language == Language::Arabic,
            RuleLanguage::English => language == Language::English,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleLanguage::Arabic => "ar",
            RuleLanguage::English => "en",
            RuleLanguage::Both => "both",
        }
    }
}

impl Display for RuleLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleLanguage {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ar" | "arabic" => Ok(RuleLanguage::Arabic),
            "en" | "english" => Ok(RuleLanguage::English),
            "both" => Ok(RuleLanguage::Both),
            _ => Err(TypeError::UnknownLabel {
                kind: "rule language",
                value: s.to_string(),
            }),
        }
    }
}

impl From<Language> for RuleLanguage {
    fn from(language: Language) -> Self {
        match language {
            Language::Arabic => RuleLanguage::Arabic,
            Language::English => RuleLanguage::English,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Personal,
    Financial,
    Legal,
    Custom,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Personal => "personal",
            RuleCategory::Financial => "financial",
            RuleCategory::Legal => "legal",
            RuleCategory::Custom => "custom",
        }
    }
}

impl Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "personal" => Ok(RuleCategory::Personal),
            "financial" => Ok(RuleCategory::Financial),
            "legal" => Ok(RuleCategory::Legal),
            "custom" => Ok(RuleCategory::Custom),
            _ => Err(TypeError::UnknownLabel {
                kind: "rule category",
                value: s.to_string(),
            }),
        }
    }
}

/// A stored, validated masking rule.
///
/// If `is_regex` is set, `pattern` compiled when the rule was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRule {
    pub id: RuleId,
    pub pattern: String,
    pub is_regex: bool,
    pub language: RuleLanguage,
    pub category: RuleCategory,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl MaskingRule {
    /// Short description used in audit details.
    pub fn describe(&self) -> String {
        let kind = if self.is_regex { "regex" } else { "keyword" };
        format!(
            "{kind} '{}' ({}, {})",
            self.pattern, self.language, self.category
        )
    }
}

/// A rule submitted for addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaskingRule {
    pub pattern: String,
    pub is_regex: bool,
    pub language: RuleLanguage,
    pub category: RuleCategory,
}

impl NewMaskingRule {
    pub fn keyword(pattern: impl Into<String>, language: RuleLanguage, category: RuleCategory) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: false,
            language,
            category,
        }
    }

    pub fn regex(pattern: impl Into<String>, language: RuleLanguage, category: RuleCategory) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: true,
            language,
            category,
        }
    }
}

/// Partial update to an existing rule. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    pub pattern: Option<String>,
    pub is_regex: Option<bool>,
    pub language: Option<RuleLanguage>,
    pub category: Option<RuleCategory>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.is_regex.is_none()
            && self.language.is_none()
            && self.category.is_none()
    }

    /// Lists the fields this patch changes on `rule`, as `field: old -> new`.
    pub fn changes(&self, rule: &MaskingRule) -> Vec<String> {
        let mut changes = Vec::new();
        if let Some(pattern) = &self.pattern {
            if pattern != &rule.pattern {
                changes.push(format!("pattern: {} -> {pattern}", rule.pattern));
            }
        }
        if let Some(is_regex) = self.is_regex {
            if is_regex != rule.is_regex {
                changes.push(format!("isRegex: {} -> {is_regex}", rule.is_regex));
            }
        }
        if let Some(language) = self.language {
            if language != rule.language {
                changes.push(format!("language: {} -> {language}", rule.language));
            }
        }
        if let Some(category) = self.category {
            if category != rule.category {
                changes.push(format!("category: {} -> {category}", rule.category));
            }
        }
        changes
    }
}
