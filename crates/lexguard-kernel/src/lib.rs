//! # lexguard-kernel: Functional core of `Lexguard`
//!
//! The kernel is the pure, deterministic heart of the governance core. It
//! receives a document snapshot plus a lifecycle request and produces the
//! next document together with the effects the runtime must execute.
//!
//! ## Key Principles
//!
//! - **No IO**: The kernel never touches storage or the audit log directly
//! - **No clocks**: The instant of the transition is passed in
//! - **Refusals are values**: A refused request still yields the audit
//!   record describing the refusal
//! - **Pure functions**: `transition(doc, request, policy, now) -> Transition | Refusal`
//!
//! ## Architecture
//!
//! - [`lifecycle`]: States, events and the legal transition graph
//! - [`triage`]: Confidence buckets and review priority
//! - [`document`]: The document entity and AI scoring report
//! - [`decision`]: Immutable human review decisions
//! - [`effects`]: Effects for the runtime to execute
//! - [`kernel`]: `upload` and `transition`, which tie it all together
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use lexguard_kernel::{
//!     LifecycleEvent, LifecyclePolicy, NewDocument, TransitionRequest, UploadSource, kernel,
//! };
//! use lexguard_rbac::{Actor, Principal, Role};
//! use lexguard_types::{DocumentId, Language};
//!
//! let reviewer = Actor::Principal(Principal::new("u-2", "Fatima", Role::Reviewer, Language::Arabic));
//! let draft = NewDocument::new("ruling.pdf", "SC-2024-001", Language::Arabic, UploadSource::Manual);
//!
//! let uploaded = kernel::upload(DocumentId::generate(), draft, &reviewer, Utc::now()).unwrap();
//! let doc = uploaded.document;
//!
//! let request = TransitionRequest::new(doc.version, LifecycleEvent::BeginProcessing, Actor::System);
//! let next = kernel::transition(&doc, &request, &LifecyclePolicy::default(), Utc::now()).unwrap();
//! assert_eq!(next.document.version, 2);
//! ```

use lexguard_audit::AuditRecord;
use lexguard_types::DocumentId;
use thiserror::Error;

pub mod decision;
pub mod document;
pub mod effects;
pub mod kernel;
pub mod lifecycle;
pub mod triage;

#[cfg(test)]
mod tests;

pub use decision::{DecisionType, ReviewDecision};
pub use document::{Document, NewDocument, ScoreReport, UploadSource};
pub use effects::Effect;
pub use kernel::{LifecyclePolicy, Refusal, Transition, TransitionRequest, transition, upload};
pub use lifecycle::{DocumentState, EventKind, LifecycleEvent, next_state};
pub use triage::{Priority, TriageBucket, TriageThresholds};

/// Why a lifecycle request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{actor} may not {action}: {reason}")]
    Forbidden {
        actor: String,
        action: &'static str,
        reason: String,
    },

    #[error("event {event} is not allowed from state {state}")]
    InvalidTransition {
        document_id: DocumentId,
        state: DocumentState,
        event: EventKind,
    },

    #[error("version conflict on {document_id}: expected {expected}, stored {actual}")]
    VersionConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    #[error("confidence score {0} is outside 0..=100")]
    ScoreOutOfRange(i64),
}

impl TransitionError {
    /// Builds the audit record for this refusal.
    ///
    /// `Forbidden` is recorded as denied; every other guard as failed.
    pub fn audit_record(
        &self,
        actor: &lexguard_rbac::Actor,
        action: lexguard_audit::ActionType,
        document_id: DocumentId,
    ) -> AuditRecord {
        let target = lexguard_audit::AuditTarget::document(document_id);
        match self {
            TransitionError::Forbidden { .. } => {
                AuditRecord::denied(actor, action, target, self.to_string())
            }
            _ => AuditRecord::failed(actor, action, target, self.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransitionError>;
