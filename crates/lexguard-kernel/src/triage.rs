//! Triage buckets derived from the AI confidence score.
//!
//! Buckets are never stored; they are recomputed from the score and the
//! configured thresholds whenever a view is built.

use std::fmt::Display;

use lexguard_types::ConfidenceScore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageBucket {
    LowConfidence,
    RequiresAttention,
    /// Routine review.
    Pending,
}

impl TriageBucket {
    pub const ALL: [TriageBucket; 3] = [
        TriageBucket::LowConfidence,
        TriageBucket::RequiresAttention,
        TriageBucket::Pending,
    ];

    pub fn priority(&self) -> Priority {
        match self {
            TriageBucket::LowConfidence => Priority::High,
            TriageBucket::RequiresAttention => Priority::Medium,
            TriageBucket::Pending => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriageBucket::LowConfidence => "low_confidence",
            TriageBucket::RequiresAttention => "requires_attention",
            TriageBucket::Pending => "pending",
        }
    }
}

impl Display for TriageBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review priority. Orders `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Score boundaries between buckets.
///
/// `score < low_confidence_below` is low confidence,
/// `score < requires_attention_below` requires attention, anything else is
/// routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageThresholds {
    low_confidence_below: u8,
    requires_attention_below: u8,
}

impl TriageThresholds {
    /// # Panics
    ///
    /// Panics unless `low_confidence_below < requires_attention_below <= 100`.
    /// Configuration is validated before thresholds are built.
    pub fn new(low_confidence_below: u8, requires_attention_below: u8) -> Self {
        assert!(
            low_confidence_below < requires_attention_below && requires_attention_below <= 100,
            "triage thresholds out of order: {low_confidence_below} / {requires_attention_below}"
        );
        Self {
            low_confidence_below,
            requires_attention_below,
        }
    }

    pub fn low_confidence_below(&self) -> u8 {
        self.low_confidence_below
    }

    pub fn requires_attention_below(&self) -> u8 {
        self.requires_attention_below
    }

    pub fn classify(&self, score: ConfidenceScore) -> TriageBucket {
        let value = score.value();
        if value < self.low_confidence_below {
            TriageBucket::LowConfidence
        } else if value < self.requires_attention_below {
            TriageBucket::RequiresAttention
        } else {
            TriageBucket::Pending
        }
    }
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self::new(50, 70)
    }
}
