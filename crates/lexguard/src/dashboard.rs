//! Read-only dashboard aggregates.

use std::collections::BTreeMap;

use lexguard_audit::{ActionType, AuditTarget, TargetType};
use lexguard_kernel::{DecisionType, DocumentState, TriageBucket};
use lexguard_rbac::Capability;
use lexguard_types::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::Result;
use crate::governance::Governance;

/// Inclusive score ranges of the confidence distribution.
pub const CONFIDENCE_BANDS: [(u8, u8); 5] = [(0, 20), (21, 40), (41, 60), (61, 80), (81, 100)];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub total_documents: usize,
    pub by_state: BTreeMap<DocumentState, usize>,
    /// Buckets of documents currently awaiting review.
    pub pending_by_bucket: BTreeMap<TriageBucket, usize>,
    /// Scored documents per entry of [`CONFIDENCE_BANDS`].
    pub confidence_distribution: [usize; 5],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerStats {
    pub decisions: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub reprocess_requests: usize,
}

impl Governance {
    pub fn overview(&self, ctx: &RequestContext) -> Result<Overview> {
        let target = AuditTarget::new(TargetType::Document, "overview");
        self.require(ctx, Capability::View, ActionType::View, &target)?;

        let thresholds = self.triage_thresholds();
        let mut overview = Overview::default();
        for doc in self.read(&self.inner.documents)?.values() {
            overview.total_documents += 1;
            *overview.by_state.entry(doc.state).or_default() += 1;
            if doc.is_pending_review() {
                if let Some(bucket) = doc.bucket(&thresholds) {
                    *overview.pending_by_bucket.entry(bucket).or_default() += 1;
                }
            }
            if let Some(score) = doc.confidence_score {
                let band = CONFIDENCE_BANDS
                    .iter()
                    .position(|&(lo, hi)| (lo..=hi).contains(&score.value()))
                    .unwrap_or(CONFIDENCE_BANDS.len() - 1);
                overview.confidence_distribution[band] += 1;
            }
        }
        Ok(overview)
    }

    /// Per-reviewer decision counts, keyed by principal id.
    ///
    /// Counted from the decision history, so decisions by users who have
    /// since been deactivated are still included.
    pub fn reviewer_performance(
        &self,
        ctx: &RequestContext,
    ) -> Result<BTreeMap<PrincipalId, ReviewerStats>> {
        self.require(ctx, Capability::ViewAudit, ActionType::View, &AuditTarget::audit_log())?;

        let mut stats: BTreeMap<PrincipalId, ReviewerStats> = BTreeMap::new();
        for decision in self.read(&self.inner.decisions)?.values().flatten() {
            let row = stats.entry(decision.actor_id.clone()).or_default();
            row.decisions += 1;
            match decision.decision_type {
                DecisionType::Approve => row.approvals += 1,
                DecisionType::Reject => row.rejections += 1,
                DecisionType::RequestReprocess => row.reprocess_requests += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_every_score_once() {
        for score in 0..=100u8 {
            let hits = CONFIDENCE_BANDS
                .iter()
                .filter(|&&(lo, hi)| (lo..=hi).contains(&score))
                .count();
            assert_eq!(hits, 1, "score {score}");
        }
    }

    #[test]
    fn overview_serializes_with_named_keys() {
        let mut overview = Overview::default();
        overview.by_state.insert(DocumentState::PendingReview, 2);
        overview.pending_by_bucket.insert(TriageBucket::LowConfidence, 2);

        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["by_state"]["pending_review"], 2);
        assert_eq!(json["pending_by_bucket"]["low_confidence"], 2);
    }
}
