//! Document states, lifecycle events and the legal transition graph.
//!
//! ```text
//! Uploaded           --BeginProcessing-->  Processing
//! Processing         --ScoreReported---->  PendingReview
//! PendingReview      --Approve---------->  Approved
//! PendingReview      --Reject----------->  Rejected
//! PendingReview      --RequestReprocess->  ReprocessRequested
//! ReprocessRequested --BeginProcessing-->  Processing
//! Approved           --Publish---------->  Published
//! ```
//!
//! `Published` and `Rejected` are terminal.

use std::fmt::Display;

use lexguard_audit::ActionType;
use lexguard_rbac::Capability;
use serde::{Deserialize, Serialize};

use crate::document::ScoreReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Uploaded,
    Processing,
    PendingReview,
    Approved,
    Rejected,
    ReprocessRequested,
    Published,
}

impl DocumentState {
    pub const ALL: [DocumentState; 7] = [
        DocumentState::Uploaded,
        DocumentState::Processing,
        DocumentState::PendingReview,
        DocumentState::Approved,
        DocumentState::Rejected,
        DocumentState::ReprocessRequested,
        DocumentState::Published,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentState::Published | DocumentState::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentState::Uploaded => "uploaded",
            DocumentState::Processing => "processing",
            DocumentState::PendingReview => "pending_review",
            DocumentState::Approved => "approved",
            DocumentState::Rejected => "rejected",
            DocumentState::ReprocessRequested => "reprocess_requested",
            DocumentState::Published => "published",
        }
    }
}

impl Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to move a document along its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The AI pipeline picked the document up.
    BeginProcessing,
    /// The AI pipeline reported its confidence and redaction metadata.
    ScoreReported(ScoreReport),
    Approve,
    Reject,
    RequestReprocess,
    /// Release an approved document to the target system.
    Publish,
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::BeginProcessing => EventKind::BeginProcessing,
            LifecycleEvent::ScoreReported(_) => EventKind::ScoreReported,
            LifecycleEvent::Approve => EventKind::Approve,
            LifecycleEvent::Reject => EventKind::Reject,
            LifecycleEvent::RequestReprocess => EventKind::RequestReprocess,
            LifecycleEvent::Publish => EventKind::Publish,
        }
    }
}

/// Payload-free discriminant of [`LifecycleEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BeginProcessing,
    ScoreReported,
    Approve,
    Reject,
    RequestReprocess,
    Publish,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::BeginProcessing,
        EventKind::ScoreReported,
        EventKind::Approve,
        EventKind::Reject,
        EventKind::RequestReprocess,
        EventKind::Publish,
    ];

    /// Pipeline events come from the system actor only.
    pub fn is_pipeline(&self) -> bool {
        matches!(self, EventKind::BeginProcessing | EventKind::ScoreReported)
    }

    /// Events that produce a [`crate::ReviewDecision`].
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            EventKind::Approve | EventKind::Reject | EventKind::RequestReprocess
        )
    }

    /// Capability a human principal needs to issue this event, if any.
    pub fn required_capability(&self) -> Option<Capability> {
        if self.is_pipeline() {
            None
        } else {
            Some(Capability::Decide)
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            EventKind::BeginProcessing | EventKind::ScoreReported | EventKind::RequestReprocess => {
                ActionType::Edit
            }
            EventKind::Approve | EventKind::Publish => ActionType::Approve,
            EventKind::Reject => ActionType::Reject,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BeginProcessing => "begin_processing",
            EventKind::ScoreReported => "score_reported",
            EventKind::Approve => "approve",
            EventKind::Reject => "reject",
            EventKind::RequestReprocess => "request_reprocess",
            EventKind::Publish => "publish",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition graph. Returns `None` for an illegal (state, event) pair.
///
/// Auto-publish is not an edge here; it is a policy applied by the kernel
/// on top of `Processing -ScoreReported-> PendingReview`.
pub fn next_state(state: DocumentState, event: EventKind) -> Option<DocumentState> {
    use DocumentState as S;
    use EventKind as E;

    match (state, event) {
        (S::Uploaded | S::ReprocessRequested, E::BeginProcessing) => Some(S::Processing),
        (S::Processing, E::ScoreReported) => Some(S::PendingReview),
        (S::PendingReview, E::Approve) => Some(S::Approved),
        (S::PendingReview, E::Reject) => Some(S::Rejected),
        (S::PendingReview, E::RequestReprocess) => Some(S::ReprocessRequested),
        (S::Approved, E::Publish) => Some(S::Published),
        _ => None,
    }
}
