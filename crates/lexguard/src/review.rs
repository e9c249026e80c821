//! Review queue: the derived list of documents awaiting a decision, and
//! bulk decisions over it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use lexguard_audit::{ActionType, AuditTarget, TargetType};
use lexguard_kernel::{DecisionType, Document, Priority, TriageBucket};
use lexguard_rbac::Capability;
use lexguard_types::{DocumentId, Language};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::RequestContext;
use crate::error::Result;
use crate::governance::Governance;

/// Restricts the pending queue. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFilter {
    pub bucket: Option<TriageBucket>,
    /// Case-insensitive match on file name or case number.
    pub search: Option<String>,
    /// Inclusive lower bound on upload time.
    pub uploaded_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on upload time.
    pub uploaded_to: Option<DateTime<Utc>>,
    pub language: Option<Language>,
}

impl ReviewFilter {
    pub fn with_bucket(mut self, bucket: TriageBucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_upload_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.uploaded_from = Some(from);
        self.uploaded_to = Some(to);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    fn matches(&self, item: &PendingItem) -> bool {
        let doc = &item.document;
        if self.bucket.is_some_and(|b| b != item.bucket) {
            return false;
        }
        if self.language.is_some_and(|l| l != doc.language) {
            return false;
        }
        if self.uploaded_from.is_some_and(|from| doc.created_at < from) {
            return false;
        }
        if self.uploaded_to.is_some_and(|to| doc.created_at > to) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = doc.file_name.to_lowercase().contains(&term)
                || doc.case_number.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Queue ordering. Ties fall back to upload time, then id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    /// Worst score first.
    #[default]
    ScoreAscending,
    UploadDateDescending,
    PriorityDescending,
}

impl ReviewSort {
    fn compare(self, a: &PendingItem, b: &PendingItem) -> Ordering {
        let primary = match self {
            ReviewSort::ScoreAscending => a.document.confidence_score.cmp(&b.document.confidence_score),
            ReviewSort::UploadDateDescending => b.document.created_at.cmp(&a.document.created_at),
            ReviewSort::PriorityDescending => b.priority.cmp(&a.priority),
        };
        primary
            .then_with(|| a.document.created_at.cmp(&b.document.created_at))
            .then_with(|| a.document.id.cmp(&b.document.id))
    }
}

/// A pending document with its derived triage data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    pub document: Document,
    pub bucket: TriageBucket,
    pub priority: Priority,
}

/// One page of the review queue. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPage {
    pub items: Vec<PendingItem>,
    pub page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// A document and the version the caller last saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    pub document_id: DocumentId,
    pub expected_version: u64,
}

impl BulkItem {
    pub fn new(document_id: DocumentId, expected_version: u64) -> Self {
        Self {
            document_id,
            expected_version,
        }
    }
}

impl From<&Document> for BulkItem {
    fn from(doc: &Document) -> Self {
        Self::new(doc.id, doc.version)
    }
}

impl Governance {
    /// Documents in `PendingReview` matching `filter`, ordered by `sort`.
    pub fn list_pending(
        &self,
        ctx: &RequestContext,
        filter: &ReviewFilter,
        sort: ReviewSort,
    ) -> Result<Vec<PendingItem>> {
        let target = AuditTarget::new(TargetType::Document, "review-queue");
        self.require(ctx, Capability::View, ActionType::View, &target)?;

        let thresholds = self.triage_thresholds();
        let mut items: Vec<PendingItem> = self
            .read(&self.inner.documents)?
            .values()
            .filter(|doc| doc.is_pending_review())
            .filter_map(|doc| {
                let bucket = doc.bucket(&thresholds)?;
                Some(PendingItem {
                    document: doc.clone(),
                    bucket,
                    priority: bucket.priority(),
                })
            })
            .filter(|item| filter.matches(item))
            .collect();
        items.sort_by(|a, b| sort.compare(a, b));
        Ok(items)
    }

    /// Page `page` (1-based) of the queue using the configured page size.
    /// Pages past the end are empty.
    pub fn pending_page(
        &self,
        ctx: &RequestContext,
        filter: &ReviewFilter,
        sort: ReviewSort,
        page: usize,
    ) -> Result<ReviewPage> {
        let items = self.list_pending(ctx, filter, sort)?;
        let page_size = self.inner.review.page_size;
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size);
        let page = page.max(1);
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(ReviewPage {
            items,
            page,
            total_items,
            total_pages,
        })
    }

    /// Applies one decision to many documents.
    ///
    /// Each item goes through the same guarded transition as
    /// [`Governance::decide`], on the bulk pool. A failure on one id never
    /// affects another; there is no rollback. Repeated ids are decided once.
    pub fn bulk_decide(
        &self,
        ctx: &RequestContext,
        items: &[BulkItem],
        decision: DecisionType,
        comment: Option<&str>,
    ) -> BTreeMap<DocumentId, Result<Document>> {
        let mut seen = BTreeSet::new();
        let unique: Vec<BulkItem> = items
            .iter()
            .copied()
            .filter(|item| seen.insert(item.document_id))
            .collect();

        let results: BTreeMap<DocumentId, Result<Document>> = self.inner.bulk_pool.install(|| {
            unique
                .par_iter()
                .map(|item| {
                    let outcome = self.decide(
                        ctx,
                        item.document_id,
                        item.expected_version,
                        decision,
                        comment,
                    );
                    (item.document_id, outcome)
                })
                .collect()
        });

        let succeeded = results.values().filter(|r| r.is_ok()).count();
        info!(
            decision = %decision.event(),
            requested = unique.len(),
            succeeded,
            failed = unique.len() - succeeded,
            "bulk decision finished"
        );
        results
    }
}
