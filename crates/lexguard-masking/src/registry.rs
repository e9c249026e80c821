//! In-memory masking rule registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lexguard_types::{Language, PrincipalId, RuleId};
use serde::{Deserialize, Serialize};

use crate::rule::{MaskingRule, NewMaskingRule, RuleCategory, RuleLanguage, RulePatch};
use crate::validate::validate_pattern;
use crate::{Result, ValidationError};

/// Stable read interface for the external redaction engine.
pub trait RuleSource {
    /// All active rules in ascending id order.
    fn active_rules(&self) -> Vec<MaskingRule>;

    /// Active rules covering documents in `language`, in ascending id order.
    fn rules_for(&self, language: Language) -> Vec<MaskingRule> {
        self.active_rules()
            .into_iter()
            .filter(|rule| rule.language.covers(language))
            .collect()
    }

    /// Whether the engine should apply its more aggressive masking
    /// patterns on top of these rules.
    fn strict_mode(&self) -> bool {
        false
    }
}

/// Filter for [`MaskingRuleRegistry::list_rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilter {
    /// Keeps rules that cover this document language (`Both` always does).
    pub language: Option<Language>,
    pub category: Option<RuleCategory>,
    /// Case-insensitive substring of the pattern.
    pub search: Option<String>,
}

impl RuleFilter {
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn matches(&self, rule: &MaskingRule) -> bool {
        self.language.is_none_or(|l| rule.language.covers(l))
            && self.category.is_none_or(|c| rule.category == c)
            && self
                .search
                .as_ref()
                .is_none_or(|term| rule.pattern.to_lowercase().contains(&term.to_lowercase()))
    }
}

/// Owner of rule validity.
///
/// Every rule held here passed [`validate_pattern`] on its last write, and
/// no two rules share the same `(pattern, language)` pair. Authorization
/// and auditing of changes are the caller's concern.
#[derive(Debug, Clone)]
pub struct MaskingRuleRegistry {
    rules: BTreeMap<RuleId, MaskingRule>,
    next_id: RuleId,
}

impl Default for MaskingRuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskingRuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            next_id: RuleId::new(1),
        }
    }

    /// Validates and stores `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty or non-compiling pattern, or
    /// when an identical `(pattern, language)` rule exists. Nothing is
    /// stored on error.
    pub fn add_rule(
        &mut self,
        draft: NewMaskingRule,
        created_by: &PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<RuleId> {
        validate_pattern(&draft.pattern, draft.is_regex)?;
        self.ensure_unique(&draft.pattern, draft.language, None)?;

        let id = self.next_id;
        self.next_id = id.next();
        self.rules.insert(
            id,
            MaskingRule {
                id,
                pattern: draft.pattern,
                is_regex: draft.is_regex,
                language: draft.language,
                category: draft.category,
                created_by: created_by.clone(),
                created_at: now,
                last_modified_at: now,
            },
        );
        Ok(id)
    }

    /// Applies `patch` to rule `id`, revalidating the result as `add_rule`
    /// would. Returns the updated rule.
    pub fn update_rule(
        &mut self,
        id: RuleId,
        patch: &RulePatch,
        now: DateTime<Utc>,
    ) -> Result<MaskingRule> {
        let current = self
            .rules
            .get(&id)
            .ok_or(ValidationError::RuleNotFound(id))?;

        let mut updated = current.clone();
        if let Some(pattern) = &patch.pattern {
            updated.pattern.clone_from(pattern);
        }
        if let Some(is_regex) = patch.is_regex {
            updated.is_regex = is_regex;
        }
        if let Some(language) = patch.language {
            updated.language = language;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }

        validate_pattern(&updated.pattern, updated.is_regex)?;
        self.ensure_unique(&updated.pattern, updated.language, Some(id))?;

        updated.last_modified_at = now;
        self.rules.insert(id, updated.clone());
        Ok(updated)
    }

    /// Removes rule `id`, returning it.
    pub fn remove_rule(&mut self, id: RuleId) -> Result<MaskingRule> {
        self.rules
            .remove(&id)
            .ok_or(ValidationError::RuleNotFound(id))
    }

    pub fn get(&self, id: RuleId) -> Option<&MaskingRule> {
        self.rules.get(&id)
    }

    /// Rules matching `filter`, in ascending id order.
    pub fn list_rules(&self, filter: &RuleFilter) -> Vec<MaskingRule> {
        self.rules
            .values()
            .filter(|rule| filter.matches(rule))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn ensure_unique(
        &self,
        pattern: &str,
        language: RuleLanguage,
        except: Option<RuleId>,
    ) -> Result<()> {
        let existing = self.rules.values().find(|rule| {
            Some(rule.id) != except && rule.pattern == pattern && rule.language == language
        });
        match existing {
            Some(rule) => Err(ValidationError::Duplicate {
                pattern: pattern.to_string(),
                language,
                existing: rule.id,
            }),
            None => Ok(()),
        }
    }
}

impl RuleSource for MaskingRuleRegistry {
    fn active_rules(&self) -> Vec<MaskingRule> {
        self.rules.values().cloned().collect()
    }
}
