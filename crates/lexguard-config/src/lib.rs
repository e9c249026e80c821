//! Configuration management for Lexguard
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (LEXGUARD_* prefix, `__` between keys)
//! 2. lexguard.local.toml (gitignored, local overrides)
//! 3. lexguard.toml (deployment config)
//! 4. ~/.config/lexguard/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [settings]
//! ai_confidence_threshold = 70
//! auto_publish_above_threshold = false
//! strict_redaction_mode = true
//! session_timeout_minutes = 60
//! allowed_ip_ranges = ["10.0.0.0/8"]
//!
//! [triage]
//! low_confidence_below = 50
//! requires_attention_below = 70
//! ```

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

mod cidr;
mod error;
mod loader;
mod paths;

pub use cidr::IpRange;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Lexguard configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexguardConfig {
    pub settings: GovernanceSettings,
    pub triage: TriageConfig,
    pub review: ReviewConfig,
    pub audit: AuditConfig,
}

/// Administrative options, changed at runtime only through the
/// `manage_settings` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceSettings {
    /// Auto-publish threshold, 0-100.
    pub ai_confidence_threshold: u8,
    pub auto_publish_above_threshold: bool,
    pub strict_redaction_mode: bool,
    pub session_timeout_minutes: u32,
    /// Login allowlist. Empty allows every address.
    pub allowed_ip_ranges: Vec<IpRange>,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            ai_confidence_threshold: 70,
            auto_publish_above_threshold: false,
            strict_redaction_mode: true,
            session_timeout_minutes: 60,
            allowed_ip_ranges: Vec::new(),
        }
    }
}

impl GovernanceSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai_confidence_threshold > 100 {
            return Err(ConfigError::ValidationError(format!(
                "ai_confidence_threshold must be within 0..=100, got {}",
                self.ai_confidence_threshold
            )));
        }
        if self.session_timeout_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "session_timeout_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.allowed_ip_ranges.is_empty() || self.allowed_ip_ranges.iter().any(|r| r.contains(ip))
    }
}

/// Partial update to [`GovernanceSettings`]. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub ai_confidence_threshold: Option<u8>,
    pub auto_publish_above_threshold: Option<bool>,
    pub strict_redaction_mode: Option<bool>,
    pub session_timeout_minutes: Option<u32>,
    pub allowed_ip_ranges: Option<Vec<IpRange>>,
}

impl SettingsUpdate {
    /// Applies the update to `current`, validating the result.
    ///
    /// Returns the new settings and one `name: old -> new` line per field
    /// that actually changed.
    pub fn apply(
        &self,
        current: &GovernanceSettings,
    ) -> Result<(GovernanceSettings, Vec<String>), ConfigError> {
        let mut next = current.clone();
        let mut changes = Vec::new();

        if let Some(value) = self.ai_confidence_threshold {
            if value != current.ai_confidence_threshold {
                changes.push(format!(
                    "aiConfidenceThreshold: {} -> {value}",
                    current.ai_confidence_threshold
                ));
                next.ai_confidence_threshold = value;
            }
        }
        if let Some(value) = self.auto_publish_above_threshold {
            if value != current.auto_publish_above_threshold {
                changes.push(format!(
                    "autoPublishAboveThreshold: {} -> {value}",
                    current.auto_publish_above_threshold
                ));
                next.auto_publish_above_threshold = value;
            }
        }
        if let Some(value) = self.strict_redaction_mode {
            if value != current.strict_redaction_mode {
                changes.push(format!(
                    "strictRedactionMode: {} -> {value}",
                    current.strict_redaction_mode
                ));
                next.strict_redaction_mode = value;
            }
        }
        if let Some(value) = self.session_timeout_minutes {
            if value != current.session_timeout_minutes {
                changes.push(format!(
                    "sessionTimeoutMinutes: {} -> {value}",
                    current.session_timeout_minutes
                ));
                next.session_timeout_minutes = value;
            }
        }
        if let Some(ranges) = &self.allowed_ip_ranges {
            if ranges != &current.allowed_ip_ranges {
                changes.push(format!(
                    "allowedIpRanges: [{}] -> [{}]",
                    join_ranges(&current.allowed_ip_ranges),
                    join_ranges(ranges)
                ));
                next.allowed_ip_ranges.clone_from(ranges);
            }
        }

        next.validate()?;
        Ok((next, changes))
    }
}

fn join_ranges(ranges: &[IpRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Triage bucket boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub low_confidence_below: u8,
    pub requires_attention_below: u8,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            low_confidence_below: 50,
            requires_attention_below: 70,
        }
    }
}

impl TriageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_confidence_below >= self.requires_attention_below
            || self.requires_attention_below > 100
        {
            return Err(ConfigError::ValidationError(format!(
                "triage thresholds must satisfy low < attention <= 100, got {} / {}",
                self.low_confidence_below, self.requires_attention_below
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Worker threads used for bulk decisions.
    pub bulk_parallelism: usize,
    /// Documents per review queue page.
    pub page_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            bulk_parallelism: 4,
            page_size: 10,
        }
    }
}

/// Upper bound on bulk worker threads.
pub const MAX_BULK_PARALLELISM: usize = 64;

impl ReviewConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bulk_parallelism == 0 || self.bulk_parallelism > MAX_BULK_PARALLELISM {
            return Err(ConfigError::ValidationError(format!(
                "review.bulk_parallelism must be within 1..={MAX_BULK_PARALLELISM}, got {}",
                self.bulk_parallelism
            )));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "review.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Entries per audit page.
    pub page_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl LexguardConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific deployment directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML document, without merging other sources.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        self.triage.validate()?;
        self.review.validate()?;
        if self.audit.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "audit.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
