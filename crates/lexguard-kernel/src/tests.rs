//! Unit tests for lexguard-kernel
//!
//! The kernel is pure, so every path is exercised without a runtime.

use chrono::{DateTime, Duration, TimeZone, Utc};
use lexguard_audit::{ActionType, AuditActor, AuditOutcome};
use lexguard_rbac::{Actor, Principal, Role};
use lexguard_types::{ConfidenceScore, DocumentId, Language};
use proptest::prelude::*;
use test_case::test_case;

use crate::TransitionError;
use crate::decision::DecisionType;
use crate::document::{Document, NewDocument, ScoreReport, UploadSource};
use crate::effects::Effect;
use crate::kernel::{LifecyclePolicy, Refusal, Transition, TransitionRequest, transition, upload};
use crate::lifecycle::{DocumentState, EventKind, LifecycleEvent, next_state};
use crate::triage::{Priority, TriageBucket, TriageThresholds};

// ============================================================================
// Test Helpers
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
}

fn principal(role: Role) -> Actor {
    let id = match role {
        Role::Admin => "u-1",
        Role::Reviewer => "u-2",
        Role::Publisher => "u-3",
    };
    Actor::Principal(Principal::new(id, "Test User", role, Language::English))
}

fn reviewer() -> Actor {
    principal(Role::Reviewer)
}

fn uploaded() -> Document {
    let draft = NewDocument::new(
        "supreme_court_ruling_2024_001.pdf",
        "SC-2024-001",
        Language::Arabic,
        UploadSource::Manual,
    );
    upload(DocumentId::generate(), draft, &reviewer(), t0())
        .expect("upload by reviewer")
        .document
}

fn apply(doc: &Document, event: LifecycleEvent, actor: Actor) -> Result<Transition, Refusal> {
    let request = TransitionRequest::new(doc.version, event, actor).with_comment("checked");
    transition(doc, &request, &LifecyclePolicy::default(), t0() + Duration::minutes(1))
}

/// Drives a fresh document to `PendingReview` with `score`.
fn pending_with(score: i64) -> Document {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    apply(
        &doc,
        LifecycleEvent::ScoreReported(ScoreReport::new(score)),
        Actor::System,
    )
    .unwrap()
    .document
}

fn audit_of(transition: &Transition) -> &lexguard_audit::AuditRecord {
    transition.audit_record().expect("audit record present")
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn upload_starts_at_version_one_in_uploaded() {
    let doc = uploaded();
    assert_eq!(doc.state, DocumentState::Uploaded);
    assert_eq!(doc.version, 1);
    assert_eq!(doc.confidence_score, None);
    assert_eq!(doc.uploaded_by.as_ref().map(|p| p.as_str()), Some("u-2"));
}

#[test]
fn upload_emits_audit_then_write() {
    let draft = NewDocument::new("a.pdf", "C-1", Language::English, UploadSource::Manual);
    let result = upload(DocumentId::generate(), draft, &reviewer(), t0()).unwrap();
    assert!(matches!(result.effects[0], Effect::AuditLogAppend(_)));
    assert!(matches!(result.effects[1], Effect::DocumentWrite(_)));
    assert_eq!(audit_of(&result).action_type, ActionType::Upload);
}

#[test]
fn integration_upload_may_come_from_system() {
    let draft = NewDocument::new("feed.pdf", "C-2", Language::English, UploadSource::Integration);
    let result = upload(DocumentId::generate(), draft, &Actor::System, t0()).unwrap();
    assert_eq!(result.document.uploaded_by, None);
    assert_eq!(audit_of(&result).actor, AuditActor::System);
}

#[test]
fn manual_upload_from_system_is_denied() {
    let draft = NewDocument::new("x.pdf", "C-3", Language::English, UploadSource::Manual);
    let refusal = upload(DocumentId::generate(), draft, &Actor::System, t0()).unwrap_err();
    assert!(matches!(refusal.error, TransitionError::Forbidden { .. }));
    assert!(matches!(refusal.audit.outcome, AuditOutcome::Denied { .. }));
}

// ============================================================================
// Transition graph
// ============================================================================

#[test_case(DocumentState::Uploaded, EventKind::BeginProcessing => Some(DocumentState::Processing))]
#[test_case(DocumentState::ReprocessRequested, EventKind::BeginProcessing => Some(DocumentState::Processing))]
#[test_case(DocumentState::Processing, EventKind::ScoreReported => Some(DocumentState::PendingReview))]
#[test_case(DocumentState::PendingReview, EventKind::Approve => Some(DocumentState::Approved))]
#[test_case(DocumentState::PendingReview, EventKind::Reject => Some(DocumentState::Rejected))]
#[test_case(DocumentState::PendingReview, EventKind::RequestReprocess => Some(DocumentState::ReprocessRequested))]
#[test_case(DocumentState::Approved, EventKind::Publish => Some(DocumentState::Published))]
#[test_case(DocumentState::Uploaded, EventKind::Approve => None; "approve before scoring")]
#[test_case(DocumentState::PendingReview, EventKind::Publish => None; "publish without approval")]
#[test_case(DocumentState::Approved, EventKind::Reject => None; "reject after approval")]
#[test_case(DocumentState::Processing, EventKind::BeginProcessing => None; "double processing")]
fn graph_edges(state: DocumentState, event: EventKind) -> Option<DocumentState> {
    next_state(state, event)
}

#[test]
fn terminal_states_have_no_outgoing_edges() {
    for state in DocumentState::ALL.into_iter().filter(DocumentState::is_terminal) {
        for event in EventKind::ALL {
            assert_eq!(next_state(state, event), None, "{state} --{event}-->");
        }
    }
}

#[test]
fn full_happy_path_increments_version_each_step() {
    let doc = pending_with(82);
    assert_eq!(doc.version, 3);
    let approved = apply(&doc, LifecycleEvent::Approve, reviewer()).unwrap();
    assert_eq!(approved.document.state, DocumentState::Approved);
    assert_eq!(approved.document.version, 4);

    let published = apply(
        &approved.document,
        LifecycleEvent::Publish,
        principal(Role::Publisher),
    )
    .unwrap();
    assert_eq!(published.document.state, DocumentState::Published);
    assert_eq!(published.document.version, 5);
    assert_eq!(audit_of(&published).action_type, ActionType::Approve);
    assert!(published.decision().is_none());
}

#[test]
fn score_report_records_metadata() {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let report = ScoreReport::new(67).with_redactions(12, ["national_id", "phone"]);
    let scored = apply(&doc, LifecycleEvent::ScoreReported(report), Actor::System)
        .unwrap()
        .document;

    assert_eq!(scored.confidence_score, Some(ConfidenceScore::new(67).unwrap()));
    assert_eq!(scored.redacted_area_count, 12);
    assert!(scored.sensitive_categories.contains("national_id"));
    assert_eq!(
        scored.bucket(&TriageThresholds::default()),
        Some(TriageBucket::RequiresAttention)
    );
}

#[test]
fn reprocess_cycle_overwrites_score() {
    let doc = pending_with(30);
    let doc = apply(&doc, LifecycleEvent::RequestReprocess, reviewer())
        .unwrap()
        .document;
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let doc = apply(
        &doc,
        LifecycleEvent::ScoreReported(ScoreReport::new(91)),
        Actor::System,
    )
    .unwrap()
    .document;
    assert_eq!(doc.confidence_score.map(|s| s.value()), Some(91));
    assert_eq!(doc.version, 6);
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn stale_version_is_a_conflict() {
    let doc = pending_with(80);
    let request = TransitionRequest::new(doc.version - 1, LifecycleEvent::Approve, reviewer());
    let refusal = transition(&doc, &request, &LifecyclePolicy::default(), t0()).unwrap_err();
    assert_eq!(
        refusal.error,
        TransitionError::VersionConflict {
            document_id: doc.id,
            expected: doc.version - 1,
            actual: doc.version,
        }
    );
    assert!(matches!(refusal.audit.outcome, AuditOutcome::Failed { .. }));
}

#[test]
fn illegal_event_is_invalid_transition() {
    let doc = uploaded();
    let refusal = apply(&doc, LifecycleEvent::Approve, reviewer()).unwrap_err();
    assert!(matches!(
        refusal.error,
        TransitionError::InvalidTransition {
            state: DocumentState::Uploaded,
            event: EventKind::Approve,
            ..
        }
    ));
    assert_eq!(refusal.audit.action_type, ActionType::Approve);
}

#[test]
fn authorization_is_checked_before_version() {
    let doc = pending_with(80);
    let request = TransitionRequest::new(99, LifecycleEvent::Approve, Actor::System);
    let refusal = transition(&doc, &request, &LifecyclePolicy::default(), t0()).unwrap_err();
    assert!(matches!(refusal.error, TransitionError::Forbidden { .. }));
}

#[test]
fn humans_cannot_report_scores() {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let refusal = apply(
        &doc,
        LifecycleEvent::ScoreReported(ScoreReport::new(99)),
        principal(Role::Admin),
    )
    .unwrap_err();
    assert!(matches!(refusal.error, TransitionError::Forbidden { .. }));
    assert!(matches!(refusal.audit.outcome, AuditOutcome::Denied { .. }));
}

#[test_case(-1; "negative")]
#[test_case(101; "just above range")]
#[test_case(1_000; "far above range")]
fn out_of_range_score_is_refused(score: i64) {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let refusal = apply(
        &doc,
        LifecycleEvent::ScoreReported(ScoreReport::new(score)),
        Actor::System,
    )
    .unwrap_err();
    assert_eq!(refusal.error, TransitionError::ScoreOutOfRange(score));
}

#[test]
fn reject_without_comment_is_accepted() {
    let doc = pending_with(80);
    let request = TransitionRequest::new(doc.version, LifecycleEvent::Reject, reviewer());
    let accepted = transition(&doc, &request, &LifecyclePolicy::default(), t0()).unwrap();
    assert_eq!(accepted.document.state, DocumentState::Rejected);
    assert_eq!(accepted.decision().unwrap().comment, None);
}

#[test]
fn low_confidence_approval_needs_no_comment() {
    let low = pending_with(45);
    let request = TransitionRequest::new(low.version, LifecycleEvent::Approve, reviewer());
    let accepted = transition(&low, &request, &LifecyclePolicy::default(), t0()).unwrap();
    assert_eq!(accepted.document.state, DocumentState::Approved);
}

#[test]
fn comment_is_recorded_trimmed_and_blank_is_dropped() {
    let doc = pending_with(80);
    let explained = TransitionRequest::new(doc.version, LifecycleEvent::Reject, reviewer())
        .with_comment("  names left unmasked on page 3 ");
    let accepted = transition(&doc, &explained, &LifecyclePolicy::default(), t0()).unwrap();
    let decision = accepted.decision().unwrap();
    assert_eq!(decision.decision_type, DecisionType::Reject);
    assert_eq!(decision.comment.as_deref(), Some("names left unmasked on page 3"));

    let blank = TransitionRequest::new(doc.version, LifecycleEvent::Reject, reviewer())
        .with_comment("   ");
    let accepted = transition(&doc, &blank, &LifecyclePolicy::default(), t0()).unwrap();
    assert_eq!(accepted.decision().unwrap().comment, None);
}

// ============================================================================
// Decisions and auto-publish
// ============================================================================

#[test]
fn decision_snapshots_actor_role() {
    let doc = pending_with(75);
    let accepted = apply(&doc, LifecycleEvent::Approve, principal(Role::Publisher)).unwrap();
    let decision = accepted.decision().unwrap();
    assert_eq!(decision.actor_role, Role::Publisher);
    assert_eq!(decision.actor_id.as_str(), "u-3");
    assert_eq!(decision.document_id, doc.id);
}

#[test]
fn auto_publish_skips_review_and_attributes_system() {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let policy = LifecyclePolicy {
        auto_publish_at: Some(ConfidenceScore::new(90).unwrap()),
        ..LifecyclePolicy::default()
    };
    let request = TransitionRequest::new(
        doc.version,
        LifecycleEvent::ScoreReported(ScoreReport::new(95)),
        Actor::System,
    );
    let accepted = transition(&doc, &request, &policy, t0()).unwrap();

    assert_eq!(accepted.document.state, DocumentState::Published);
    assert_eq!(accepted.document.version, doc.version + 1);
    let audit = audit_of(&accepted);
    assert_eq!(audit.actor, AuditActor::System);
    assert_eq!(audit.action_type, ActionType::Approve);
    assert!(audit.details.starts_with("auto-published"));
    assert!(accepted.decision().is_none());
}

#[test]
fn auto_publish_below_threshold_goes_to_review() {
    let doc = uploaded();
    let doc = apply(&doc, LifecycleEvent::BeginProcessing, Actor::System)
        .unwrap()
        .document;
    let policy = LifecyclePolicy {
        auto_publish_at: Some(ConfidenceScore::new(90).unwrap()),
        ..LifecyclePolicy::default()
    };
    let request = TransitionRequest::new(
        doc.version,
        LifecycleEvent::ScoreReported(ScoreReport::new(89)),
        Actor::System,
    );
    let accepted = transition(&doc, &request, &policy, t0()).unwrap();
    assert_eq!(accepted.document.state, DocumentState::PendingReview);
}

// ============================================================================
// Triage
// ============================================================================

#[test_case(0 => TriageBucket::LowConfidence)]
#[test_case(45 => TriageBucket::LowConfidence)]
#[test_case(49 => TriageBucket::LowConfidence)]
#[test_case(50 => TriageBucket::RequiresAttention)]
#[test_case(69 => TriageBucket::RequiresAttention)]
#[test_case(70 => TriageBucket::Pending)]
#[test_case(100 => TriageBucket::Pending)]
fn default_buckets(score: u8) -> TriageBucket {
    TriageThresholds::default().classify(ConfidenceScore::new(score).unwrap())
}

#[test]
fn bucket_priority_order() {
    assert!(TriageBucket::LowConfidence.priority() > TriageBucket::RequiresAttention.priority());
    assert_eq!(TriageBucket::Pending.priority(), Priority::Low);
}

#[test]
#[should_panic(expected = "triage thresholds out of order")]
fn inverted_thresholds_panic() {
    let _ = TriageThresholds::new(70, 50);
}

// ============================================================================
// Properties
// ============================================================================

fn arb_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::BeginProcessing),
        (-10i64..=110).prop_map(|s| LifecycleEvent::ScoreReported(ScoreReport::new(s))),
        Just(LifecycleEvent::Approve),
        Just(LifecycleEvent::Reject),
        Just(LifecycleEvent::RequestReprocess),
        Just(LifecycleEvent::Publish),
    ]
}

fn arb_actor() -> impl Strategy<Value = Actor> {
    prop_oneof![
        Just(Actor::System),
        Just(principal(Role::Admin)),
        Just(principal(Role::Reviewer)),
        Just(principal(Role::Publisher)),
    ]
}

proptest! {
    #[test]
    fn prop_version_advances_by_one_or_not_at_all(
        steps in prop::collection::vec((arb_event(), arb_actor(), any::<bool>(), any::<bool>()), 1..40)
    ) {
        let mut doc = uploaded();
        for (event, actor, stale, with_comment) in steps {
            let expected = if stale { doc.version + 1 } else { doc.version };
            let mut request = TransitionRequest::new(expected, event, actor);
            if with_comment {
                request = request.with_comment("ok");
            }
            let before = doc.clone();
            match transition(&doc, &request, &LifecyclePolicy::default(), t0()) {
                Ok(accepted) => {
                    prop_assert!(!stale);
                    prop_assert_eq!(accepted.document.version, before.version + 1);
                    prop_assert_eq!(
                        Some(accepted.document.state),
                        next_state(before.state, request.event.kind())
                    );
                    doc = accepted.document;
                }
                Err(refusal) => {
                    prop_assert_eq!(&doc, &before);
                    prop_assert!(!refusal.audit.outcome.is_success());
                }
            }
        }
    }

    #[test]
    fn prop_illegal_pairs_are_always_invalid_transition(
        state_idx in 0usize..7,
        event in arb_event(),
    ) {
        let mut doc = uploaded();
        doc.state = DocumentState::ALL[state_idx];
        doc.confidence_score = Some(ConfidenceScore::new(85).unwrap());
        let actor = if event.kind().is_pipeline() { Actor::System } else { reviewer() };
        let request = TransitionRequest::new(doc.version, event.clone(), actor).with_comment("c");
        let result = transition(&doc, &request, &LifecyclePolicy::default(), t0());
        if next_state(doc.state, event.kind()).is_none() {
            let is_invalid = matches!(
                result,
                Err(Refusal { error: TransitionError::InvalidTransition { .. }, .. })
            );
            prop_assert!(is_invalid);
        }
    }
}
