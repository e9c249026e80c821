//! The document entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use lexguard_types::{ConfidenceScore, DocumentId, Language, PrincipalId};
use serde::{Deserialize, Serialize};

use crate::lifecycle::DocumentState;
use crate::triage::{TriageBucket, TriageThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadSource {
    Manual,
    Integration,
}

/// Metadata supplied with an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub file_name: String,
    /// Not an identity: re-uploads of the same case get fresh ids.
    pub case_number: String,
    pub language: Language,
    pub source: UploadSource,
}

impl NewDocument {
    pub fn new(
        file_name: impl Into<String>,
        case_number: impl Into<String>,
        language: Language,
        source: UploadSource,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            case_number: case_number.into(),
            language,
            source,
        }
    }
}

/// Report from the external AI engine, the only writer of the confidence
/// score.
///
/// The score arrives unchecked and is range-validated by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub confidence_score: i64,
    pub redacted_area_count: u32,
    pub sensitive_categories: BTreeSet<String>,
}

impl ScoreReport {
    pub fn new(confidence_score: i64) -> Self {
        Self {
            confidence_score,
            redacted_area_count: 0,
            sensitive_categories: BTreeSet::new(),
        }
    }

    pub fn with_redactions(
        mut self,
        redacted_area_count: u32,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.redacted_area_count = redacted_area_count;
        self.sensitive_categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

/// A legal document moving through review.
///
/// `state` and `version` change only through [`crate::kernel::transition`];
/// `version` starts at 1 and grows by exactly 1 per accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub file_name: String,
    pub case_number: String,
    pub source: UploadSource,
    pub language: Language,
    pub state: DocumentState,
    pub version: u64,
    pub confidence_score: Option<ConfidenceScore>,
    pub redacted_area_count: u32,
    pub sensitive_categories: BTreeSet<String>,
    /// `None` for integration uploads made by the system.
    pub uploaded_by: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Derived triage bucket; `None` until a score has been reported.
    pub fn bucket(&self, thresholds: &TriageThresholds) -> Option<TriageBucket> {
        self.confidence_score.map(|score| thresholds.classify(score))
    }

    pub fn is_pending_review(&self) -> bool {
        self.state == DocumentState::PendingReview
    }
}
