//! The kernel - pure functional core of `Lexguard`.
//!
//! The kernel validates lifecycle requests against a document snapshot and
//! produces the next document plus the effects to execute. It has no IO
//! and reads no clock; the runtime supplies `now` and performs the
//! compare-and-swap against stored state.
//!
//! Guards run in a fixed order: authorization, then the optimistic version
//! check, then graph legality, then payload validation. The first failing
//! guard wins, and every refusal carries exactly one audit record.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use lexguard_audit::{ActionType, AuditRecord, AuditTarget};
use lexguard_rbac::{Actor, Capability, authorize};
use lexguard_types::{ConfidenceScore, DocumentId};
use serde::{Deserialize, Serialize};

use crate::TransitionError;
use crate::decision::{DecisionType, ReviewDecision};
use crate::document::{Document, NewDocument, UploadSource};
use crate::effects::Effect;
use crate::lifecycle::{DocumentState, EventKind, LifecycleEvent, next_state};
use crate::triage::TriageThresholds;

/// Configuration-derived rules the kernel applies on top of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    pub triage: TriageThresholds,
    /// When set, a reported score at or above this value publishes the
    /// document directly, attributed to the system actor.
    pub auto_publish_at: Option<ConfidenceScore>,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            triage: TriageThresholds::default(),
            auto_publish_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Version the caller last read.
    pub expected_version: u64,
    pub event: LifecycleEvent,
    pub actor: Actor,
    pub comment: Option<String>,
}

impl TransitionRequest {
    pub fn new(expected_version: u64, event: LifecycleEvent, actor: Actor) -> Self {
        Self {
            expected_version,
            event,
            actor,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// An accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The document as it must be stored.
    pub document: Document,
    /// Effects in execution order.
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn audit_record(&self) -> Option<&AuditRecord> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::AuditLogAppend(record) => Some(record),
            _ => None,
        })
    }

    pub fn decision(&self) -> Option<&ReviewDecision> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::DecisionAppend(decision) => Some(decision),
            _ => None,
        })
    }
}

/// A refused request, carrying the audit record of the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub error: TransitionError,
    pub audit: AuditRecord,
}

impl Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for Refusal {}

// ============================================================================
// Upload
// ============================================================================

/// Creates a document in `Uploaded` at version 1.
///
/// Manual uploads need a principal holding `decide`. Integration uploads
/// may also come from the system actor.
pub fn upload(
    id: DocumentId,
    draft: NewDocument,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Transition, Refusal> {
    let permitted = match (actor, draft.source) {
        (Actor::System, UploadSource::Integration) => Ok(()),
        (Actor::System, UploadSource::Manual) => Err("manual uploads require a human principal"),
        (Actor::Principal(p), _) if authorize(p, Capability::Decide) => Ok(()),
        (Actor::Principal(_), _) => Err("role lacks capability decide"),
    };
    if let Err(reason) = permitted {
        let error = TransitionError::Forbidden {
            actor: actor_label(actor),
            action: "upload",
            reason: reason.to_string(),
        };
        let audit = AuditRecord::denied(
            actor,
            ActionType::Upload,
            AuditTarget::document(id),
            error.to_string(),
        );
        return Err(Refusal { error, audit });
    }

    let details = format!(
        "uploaded {} (case {}, {}, {})",
        draft.file_name,
        draft.case_number,
        draft.language,
        match draft.source {
            UploadSource::Manual => "manual",
            UploadSource::Integration => "integration",
        }
    );

    let document = Document {
        id,
        file_name: draft.file_name,
        case_number: draft.case_number,
        source: draft.source,
        language: draft.language,
        state: DocumentState::Uploaded,
        version: 1,
        confidence_score: None,
        redacted_area_count: 0,
        sensitive_categories: std::collections::BTreeSet::new(),
        uploaded_by: actor.principal().map(|p| p.id.clone()),
        created_at: now,
        updated_at: now,
    };

    let effects = vec![
        Effect::AuditLogAppend(AuditRecord::success(
            actor,
            ActionType::Upload,
            AuditTarget::document(id),
            details,
        )),
        Effect::DocumentWrite(document.clone()),
    ];

    // Postcondition: every upload starts the version sequence at 1
    assert_eq!(document.version, 1, "uploaded document must start at version 1");

    Ok(Transition { document, effects })
}

// ============================================================================
// Transition
// ============================================================================

/// Applies `request` to `doc`.
///
/// On refusal `doc` is untouched and no document or decision effect is
/// produced.
pub fn transition(
    doc: &Document,
    request: &TransitionRequest,
    policy: &LifecyclePolicy,
    now: DateTime<Utc>,
) -> Result<Transition, Refusal> {
    let event = request.event.kind();
    let refuse = |error: TransitionError| Refusal {
        audit: error.audit_record(&request.actor, event.action_type(), doc.id),
        error,
    };

    // Guard 1: the actor may issue this event at all
    authorize_event(event, &request.actor).map_err(refuse)?;

    // Guard 2: the caller saw the stored version
    if request.expected_version != doc.version {
        return Err(refuse(TransitionError::VersionConflict {
            document_id: doc.id,
            expected: request.expected_version,
            actual: doc.version,
        }));
    }

    // Guard 3: the edge exists
    let Some(mut target) = next_state(doc.state, event) else {
        return Err(refuse(TransitionError::InvalidTransition {
            document_id: doc.id,
            state: doc.state,
            event,
        }));
    };

    let comment = request.comment();
    let mut next = doc.clone();
    let mut details = format!("{} -> {}", doc.state, target);

    // Guard 4: payload
    if let LifecycleEvent::ScoreReported(report) = &request.event {
        let score = ConfidenceScore::try_from(report.confidence_score)
            .map_err(|_| refuse(TransitionError::ScoreOutOfRange(report.confidence_score)))?;

        next.confidence_score = Some(score);
        next.redacted_area_count = report.redacted_area_count;
        next.sensitive_categories.clone_from(&report.sensitive_categories);

        details = format!(
            "{details}: confidence {score}, {} redacted areas, bucket {}",
            report.redacted_area_count,
            policy.triage.classify(score)
        );

        if let Some(threshold) = policy.auto_publish_at {
            if score >= threshold {
                target = DocumentState::Published;
                details = format!(
                    "auto-published: {} -> {target}, confidence {score} >= threshold {threshold}",
                    doc.state
                );
            }
        }
    }

    if let Some(comment) = comment {
        details = format!("{details}: {comment}");
    }

    next.state = target;
    next.version = doc.version + 1;
    next.updated_at = now;

    let action = if target == DocumentState::Published && event == EventKind::ScoreReported {
        ActionType::Approve
    } else {
        event.action_type()
    };

    let mut effects = vec![
        Effect::AuditLogAppend(AuditRecord::success(
            &request.actor,
            action,
            AuditTarget::document(doc.id),
            details,
        )),
        Effect::DocumentWrite(next.clone()),
    ];

    if let (Some(decision_type), Some(principal)) =
        (DecisionType::from_event(event), request.actor.principal())
    {
        effects.push(Effect::DecisionAppend(ReviewDecision {
            document_id: doc.id,
            actor_id: principal.id.clone(),
            actor_role: principal.role,
            decision_type,
            timestamp: now,
            comment: comment.map(str::to_string),
        }));
    }

    // Postcondition: version advanced by exactly one
    assert_eq!(
        next.version,
        doc.version + 1,
        "accepted transition must advance version by exactly 1"
    );
    // Postcondition: exactly one audit record per accepted transition
    assert_eq!(
        effects
            .iter()
            .filter(|e| matches!(e, Effect::AuditLogAppend(_)))
            .count(),
        1,
        "accepted transition must produce exactly one audit record"
    );
    // Postcondition: terminal states are never left
    debug_assert!(!doc.state.is_terminal());

    Ok(Transition {
        document: next,
        effects,
    })
}

fn authorize_event(event: EventKind, actor: &Actor) -> Result<(), TransitionError> {
    let forbidden = |reason: String| TransitionError::Forbidden {
        actor: actor_label(actor),
        action: event.as_str(),
        reason,
    };

    match (actor, event.required_capability()) {
        (Actor::System, None) => Ok(()),
        (Actor::Principal(_), None) => Err(forbidden(
            "pipeline events are issued by the system actor".to_string(),
        )),
        (Actor::System, Some(_)) => Err(forbidden(
            "review decisions require a human principal".to_string(),
        )),
        (Actor::Principal(p), Some(capability)) => {
            if authorize(p, capability) {
                Ok(())
            } else {
                Err(forbidden(format!(
                    "role {} lacks capability {capability}",
                    p.role
                )))
            }
        }
    }
}

fn actor_label(actor: &Actor) -> String {
    match actor {
        Actor::System => "system".to_string(),
        Actor::Principal(p) => p.id.to_string(),
    }
}
