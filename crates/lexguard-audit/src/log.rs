//! The audit log: total ordering, filtering and pagination.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use lexguard_types::{Clock, Hash, LogId, SystemClock, monotonic_after};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chain::{compute_entry_hash, rehash};
use crate::entry::{ActionType, AuditLogEntry, AuditRecord, AuditTarget, OutcomeKind, TargetType};
use crate::storage::{AuditStorage, InMemoryAuditStorage};
use crate::{AuditError, Result};

/// Entries fetched from storage per round trip by the lazy iterator.
const SCAN_BATCH: usize = 64;

// ============================================================================
// Filter
// ============================================================================

/// Query filter. All criteria are conjunctive; an empty filter matches
/// every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub action_type: Option<ActionType>,
    pub target: Option<AuditTarget>,
    pub target_type: Option<TargetType>,
    /// Inclusive lower bound.
    pub time_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub time_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring over actor id, details and target id.
    pub search: Option<String>,
    pub outcome: Option<OutcomeKind>,
}

impl AuditFilter {
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn with_target(mut self, target: AuditTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_from = Some(from);
        self.time_to = Some(to);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_outcome(mut self, outcome: OutcomeKind) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Rejects a time range whose start is after its end.
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.time_from, self.time_to) {
            if from > to {
                return Err(AuditError::InvalidQuery(format!(
                    "time range start {from} is after end {to}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(actor) = &self.actor {
            if entry.actor.id() != actor {
                return false;
            }
        }
        if let Some(action_type) = self.action_type {
            if entry.action_type != action_type {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if !entry.refers_to(target) {
                return false;
            }
        }
        if let Some(target_type) = self.target_type {
            if entry.target.target_type != target_type {
                return false;
            }
        }
        if let Some(from) = self.time_from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.time_to {
            if entry.timestamp > to {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if entry.outcome.kind() != outcome {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = [
                entry.actor.id(),
                entry.details.as_str(),
                entry.target.target_id.as_str(),
            ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Opaque resume point: the id of the last entry already delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCursor(LogId);

impl AuditCursor {
    pub fn last_seen(&self) -> LogId {
        self.0
    }
}

/// One page of matching entries, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    /// Present when the page was filled; the page after it may be empty.
    pub next_cursor: Option<AuditCursor>,
}

// ============================================================================
// Log
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ChainHead {
    last_id: LogId,
    last_timestamp: Option<DateTime<Utc>>,
    last_hash: Hash,
}

impl ChainHead {
    fn genesis() -> Self {
        Self {
            last_id: LogId::ZERO,
            last_timestamp: None,
            last_hash: Hash::GENESIS,
        }
    }
}

/// Append-only audit log.
///
/// `append` is the only write. Ids and timestamps are assigned while the
/// chain head is locked, so concurrent writers are serialized into one
/// total order.
#[derive(Debug)]
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
    clock: Arc<dyn Clock>,
    head: Mutex<ChainHead>,
}

impl AuditLog {
    /// Opens a log over `storage`, resuming the chain from its last entry.
    pub fn open(storage: Arc<dyn AuditStorage>, clock: Arc<dyn Clock>) -> Result<Self> {
        let head = match storage.last()? {
            Some(last) => ChainHead {
                last_id: last.id,
                last_timestamp: Some(last.timestamp),
                last_hash: last.entry_hash,
            },
            None => ChainHead::genesis(),
        };
        Ok(Self {
            storage,
            clock,
            head: Mutex::new(head),
        })
    }

    /// Creates an empty log over fresh in-memory storage and the system clock.
    pub fn in_memory() -> Self {
        Self::with_clock(Arc::new(InMemoryAuditStorage::new()), Arc::new(SystemClock))
    }

    /// Creates an empty log over `storage`. The storage must be empty.
    pub fn with_clock(storage: Arc<dyn AuditStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            head: Mutex::new(ChainHead::genesis()),
        }
    }

    /// Appends `record`, assigning its id, timestamp and chain hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] when the entry could not be persisted.
    /// In that case the chain head is unchanged and nothing was written.
    pub fn append(&self, record: AuditRecord) -> Result<LogId> {
        let mut head = self
            .head
            .lock()
            .map_err(|_| AuditError::Internal("audit chain head lock poisoned".to_string()))?;

        let id = head.last_id.next();
        let timestamp = monotonic_after(self.clock.now(), head.last_timestamp);
        let entry_hash = compute_entry_hash(&head.last_hash, id, timestamp, &record);

        let entry = AuditLogEntry {
            id,
            timestamp,
            actor: record.actor,
            action_type: record.action_type,
            target: record.target,
            details: record.details,
            origin: record.origin,
            outcome: record.outcome,
            prev_hash: head.last_hash,
            entry_hash,
        };

        if let Err(e) = self.storage.append(&entry) {
            error!(
                log_id = %id,
                action = %entry.action_type,
                target = %entry.target.target_id,
                error = %e,
                "audit append failed"
            );
            return Err(e.into());
        }

        let previous = head.last_id;
        *head = ChainHead {
            last_id: id,
            last_timestamp: Some(timestamp),
            last_hash: entry_hash,
        };

        // Postcondition: ids and timestamps strictly increase together
        assert!(
            head.last_id > previous,
            "audit id must advance: {previous} -> {}",
            head.last_id
        );

        debug!(log_id = %id, action = %entry.action_type, "audit entry appended");
        Ok(id)
    }

    /// Returns the entry with `id`, if stored.
    pub fn get(&self, id: LogId) -> Result<Option<AuditLogEntry>> {
        if id == LogId::ZERO {
            return Ok(None);
        }
        let previous = LogId::new(id.as_u64() - 1);
        Ok(self
            .storage
            .scan(previous, 1)?
            .into_iter()
            .find(|entry| entry.id == id))
    }

    /// Total number of entries, regardless of filter.
    pub fn len(&self) -> Result<usize> {
        Ok(self.storage.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of entries matching `filter`.
    pub fn count(&self, filter: &AuditFilter) -> Result<usize> {
        let mut total = 0;
        for entry in self.query(filter.clone())? {
            entry?;
            total += 1;
        }
        Ok(total)
    }

    /// Returns up to `limit` matching entries after `cursor`, oldest first.
    pub fn page(
        &self,
        filter: &AuditFilter,
        cursor: Option<AuditCursor>,
        limit: usize,
    ) -> Result<AuditPage> {
        if limit == 0 {
            return Err(AuditError::InvalidQuery(
                "page limit must be at least 1".to_string(),
            ));
        }
        filter.validate()?;

        let mut after = cursor.map_or(LogId::ZERO, |c| c.0);
        let mut entries = Vec::with_capacity(limit);
        loop {
            let batch = self.storage.scan(after, SCAN_BATCH)?;
            let Some(last) = batch.last() else {
                break;
            };
            after = last.id;
            let exhausted = batch.len() < SCAN_BATCH;

            for entry in batch {
                if filter.matches(&entry) {
                    entries.push(entry);
                    if entries.len() == limit {
                        let next = entries.last().map(|e| AuditCursor(e.id));
                        return Ok(AuditPage {
                            entries,
                            next_cursor: next,
                        });
                    }
                }
            }
            if exhausted {
                break;
            }
        }

        Ok(AuditPage {
            entries,
            next_cursor: None,
        })
    }

    /// Returns a lazy, finite iterator over matching entries, oldest first.
    ///
    /// Storage is read in batches as the iterator advances. The sequence
    /// reflects entries committed before each batch is fetched; it is not a
    /// live feed.
    pub fn query(&self, filter: AuditFilter) -> Result<AuditQueryIter<'_>> {
        filter.validate()?;
        Ok(AuditQueryIter {
            log: self,
            filter,
            after: LogId::ZERO,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    /// Walks the whole trail and checks every link of the hash chain.
    ///
    /// Returns the number of verified entries.
    ///
    /// # Errors
    ///
    /// [`AuditError::ChainBroken`] names the first entry whose stored hash,
    /// predecessor link, or ordering does not match.
    pub fn verify_chain(&self) -> Result<usize> {
        let mut prev_hash = Hash::GENESIS;
        let mut prev_id = LogId::ZERO;
        let mut prev_timestamp: Option<DateTime<Utc>> = None;
        let mut verified = 0;

        loop {
            let batch = self.storage.scan(prev_id, SCAN_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for entry in batch {
                let ordered = entry.id == prev_id.next()
                    && prev_timestamp.is_none_or(|t| entry.timestamp > t);
                if !ordered || entry.prev_hash != prev_hash || rehash(&entry) != entry.entry_hash {
                    error!(log_id = %entry.id, "audit chain verification failed");
                    return Err(AuditError::ChainBroken { id: entry.id });
                }
                prev_hash = entry.entry_hash;
                prev_id = entry.id;
                prev_timestamp = Some(entry.timestamp);
                verified += 1;
            }
        }

        Ok(verified)
    }
}

// ============================================================================
// Lazy query iterator
// ============================================================================

/// Iterator returned by [`AuditLog::query`].
///
/// Yields `Err` at most once, then ends.
#[derive(Debug)]
pub struct AuditQueryIter<'a> {
    log: &'a AuditLog,
    filter: AuditFilter,
    after: LogId,
    buffer: VecDeque<AuditLogEntry>,
    done: bool,
}

impl Iterator for AuditQueryIter<'_> {
    type Item = Result<AuditLogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }
            match self.log.storage.scan(self.after, SCAN_BATCH) {
                Ok(batch) => {
                    if batch.len() < SCAN_BATCH {
                        self.done = true;
                    }
                    if let Some(last) = batch.last() {
                        self.after = last.id;
                    }
                    self.buffer
                        .extend(batch.into_iter().filter(|e| self.filter.matches(e)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{AuditOutcome, OriginContext};
    use crate::storage::StorageFault;
    use chrono::{Duration, TimeZone};
    use lexguard_rbac::{Actor, Principal, Role};
    use lexguard_types::{DocumentId, Language, ManualClock};
    use proptest::prelude::*;

    fn reviewer() -> Actor {
        Actor::Principal(Principal::new(
            "u-2",
            "Fatima Al-Zahra",
            Role::Reviewer,
            Language::Arabic,
        ))
    }

    fn fixture() -> (AuditLog, Arc<InMemoryAuditStorage>, Arc<ManualClock>) {
        let storage = Arc::new(InMemoryAuditStorage::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        ));
        let log = AuditLog::with_clock(storage.clone(), clock.clone());
        (log, storage, clock)
    }

    fn view(doc: DocumentId) -> AuditRecord {
        AuditRecord::success(&reviewer(), ActionType::View, AuditTarget::document(doc), "viewed")
    }

    #[test]
    fn append_assigns_dense_increasing_ids() {
        let (log, _, _) = fixture();
        let doc = DocumentId::generate();
        let ids: Vec<_> = (0..5).map(|_| log.append(view(doc)).unwrap()).collect();
        assert_eq!(ids, (1..=5).map(LogId::new).collect::<Vec<_>>());
        assert_eq!(log.len().unwrap(), 5);
    }

    #[test]
    fn timestamps_strictly_increase_when_clock_steps_back() {
        let (log, _, clock) = fixture();
        let doc = DocumentId::generate();
        log.append(view(doc)).unwrap();
        clock.advance(Duration::hours(-1));
        log.append(view(doc)).unwrap();
        log.append(view(doc)).unwrap();

        let entries: Vec<_> = log
            .query(AuditFilter::default())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert!(entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn storage_fault_leaves_chain_untouched() {
        let (log, storage, _) = fixture();
        let doc = DocumentId::generate();
        log.append(view(doc)).unwrap();

        storage.inject_fault(StorageFault::Unavailable);
        assert!(matches!(log.append(view(doc)), Err(AuditError::Storage(_))));

        storage.clear_fault();
        let id = log.append(view(doc)).unwrap();
        assert_eq!(id, LogId::new(2));
        assert_eq!(log.verify_chain().unwrap(), 2);
    }

    #[test]
    fn filter_by_actor_action_and_target() {
        let (log, _, _) = fixture();
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        log.append(view(a)).unwrap();
        log.append(view(b)).unwrap();
        log.append(AuditRecord::success(
            &Actor::System,
            ActionType::Edit,
            AuditTarget::document(a),
            "processing",
        ))
        .unwrap();

        let by_target = AuditFilter::default().with_target(AuditTarget::document(a));
        assert_eq!(log.count(&by_target).unwrap(), 2);

        let by_actor = AuditFilter::default().with_actor("system");
        assert_eq!(log.count(&by_actor).unwrap(), 1);

        let by_action = AuditFilter::default().with_action_type(ActionType::View);
        assert_eq!(log.count(&by_action).unwrap(), 2);
    }

    #[test]
    fn time_range_is_inclusive() {
        let (log, _, clock) = fixture();
        let doc = DocumentId::generate();
        let start = clock.now();
        log.append(view(doc)).unwrap();
        clock.advance(Duration::minutes(5));
        log.append(view(doc)).unwrap();
        clock.advance(Duration::minutes(5));
        log.append(view(doc)).unwrap();

        let filter = AuditFilter::default().with_time_range(start, start + Duration::minutes(5));
        assert_eq!(log.count(&filter).unwrap(), 2);
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let (log, _, clock) = fixture();
        let now = clock.now();
        let filter = AuditFilter::default().with_time_range(now, now - Duration::days(1));
        assert!(matches!(
            log.query(filter),
            Err(AuditError::InvalidQuery(_))
        ));
    }

    #[test]
    fn search_is_case_insensitive_over_details() {
        let (log, _, _) = fixture();
        let actor = reviewer();
        log.append(AuditRecord::success(
            &actor,
            ActionType::SettingsChange,
            AuditTarget::settings(),
            "aiConfidenceThreshold: 65 -> 70",
        ))
        .unwrap();
        log.append(view(DocumentId::generate())).unwrap();

        let filter = AuditFilter::default().with_search("AICONFIDENCE");
        assert_eq!(log.count(&filter).unwrap(), 1);
    }

    #[test]
    fn outcome_filter_separates_denials() {
        let (log, _, _) = fixture();
        let doc = DocumentId::generate();
        log.append(view(doc)).unwrap();
        log.append(AuditRecord::denied(
            &reviewer(),
            ActionType::SettingsChange,
            AuditTarget::settings(),
            "missing capability manage_settings",
        ))
        .unwrap();

        let denied: Vec<_> = log
            .query(AuditFilter::default().with_outcome(OutcomeKind::Denied))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(denied.len(), 1);
        assert!(matches!(denied[0].outcome, AuditOutcome::Denied { .. }));
    }

    #[test]
    fn pagination_resumes_from_cursor() {
        let (log, _, _) = fixture();
        let doc = DocumentId::generate();
        for _ in 0..25 {
            log.append(view(doc)).unwrap();
        }

        let filter = AuditFilter::default();
        let first = log.page(&filter, None, 10).unwrap();
        assert_eq!(first.entries.len(), 10);
        let second = log.page(&filter, first.next_cursor, 10).unwrap();
        assert_eq!(second.entries[0].id, LogId::new(11));
        let third = log.page(&filter, second.next_cursor, 10).unwrap();
        assert_eq!(third.entries.len(), 5);
        assert!(third.next_cursor.is_none());
    }

    #[test]
    fn pagination_spans_scan_batches_with_sparse_matches() {
        let (log, _, _) = fixture();
        let wanted = DocumentId::generate();
        for i in 0..200 {
            let doc = if i % 50 == 0 { wanted } else { DocumentId::generate() };
            log.append(view(doc)).unwrap();
        }
        let filter = AuditFilter::default().with_target(AuditTarget::document(wanted));
        let page = log.page(&filter, None, 10).unwrap();
        assert_eq!(page.entries.len(), 4);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn zero_page_limit_is_rejected() {
        let (log, _, _) = fixture();
        assert!(matches!(
            log.page(&AuditFilter::default(), None, 0),
            Err(AuditError::InvalidQuery(_))
        ));
    }

    #[test]
    fn get_returns_stored_entry() {
        let (log, _, _) = fixture();
        let doc = DocumentId::generate();
        log.append(view(doc)).unwrap();
        let id = log
            .append(view(doc).with_origin(OriginContext::new("10.0.0.1", "s-1")))
            .unwrap();
        let entry = log.get(id).unwrap().unwrap();
        assert_eq!(entry.origin.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(log.get(LogId::new(99)).unwrap().is_none());
        assert!(log.get(LogId::ZERO).unwrap().is_none());
    }

    #[test]
    fn verify_chain_detects_tampering() {
        let (log, storage, _) = fixture();
        let doc = DocumentId::generate();
        for _ in 0..4 {
            log.append(view(doc)).unwrap();
        }
        assert_eq!(log.verify_chain().unwrap(), 4);

        storage.tamper(2, "rewritten history");
        match log.verify_chain() {
            Err(AuditError::ChainBroken { id }) => assert_eq!(id, LogId::new(3)),
            other => panic!("expected broken chain, got {other:?}"),
        }
    }

    #[test]
    fn reopen_resumes_chain() {
        let (log, storage, clock) = fixture();
        let doc = DocumentId::generate();
        log.append(view(doc)).unwrap();
        log.append(view(doc)).unwrap();
        drop(log);

        let reopened = AuditLog::open(storage, clock).unwrap();
        assert_eq!(reopened.append(view(doc)).unwrap(), LogId::new(3));
        assert_eq!(reopened.verify_chain().unwrap(), 3);
    }

    #[test]
    fn query_surfaces_storage_error_once() {
        let (log, storage, _) = fixture();
        log.append(view(DocumentId::generate())).unwrap();
        storage.inject_fault(StorageFault::Timeout(std::time::Duration::from_secs(2)));

        let mut iter = log.query(AuditFilter::default()).unwrap();
        assert!(matches!(iter.next(), Some(Err(AuditError::Storage(_)))));
        assert!(iter.next().is_none());
    }

    proptest! {
        #[test]
        fn prop_ids_and_timestamps_are_monotonic(steps in prop::collection::vec(-120i64..120, 1..40)) {
            let (log, _, clock) = fixture();
            let doc = DocumentId::generate();
            for step in steps {
                clock.advance(Duration::seconds(step));
                log.append(view(doc)).unwrap();
            }
            let entries: Vec<_> = log
                .query(AuditFilter::default())
                .unwrap()
                .map(Result::unwrap)
                .collect();
            for pair in entries.windows(2) {
                prop_assert!(pair[0].id < pair[1].id);
                prop_assert!(pair[0].timestamp < pair[1].timestamp);
                prop_assert_eq!(pair[1].prev_hash, pair[0].entry_hash);
            }
            prop_assert_eq!(log.verify_chain().unwrap(), entries.len());
        }
    }
}
