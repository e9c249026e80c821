//! Human review decisions.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use lexguard_rbac::Role;
use lexguard_types::{DocumentId, PrincipalId};
use serde::{Deserialize, Serialize};

use crate::lifecycle::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Approve,
    Reject,
    RequestReprocess,
}

impl DecisionType {
    pub fn event(&self) -> EventKind {
        match self {
            DecisionType::Approve => EventKind::Approve,
            DecisionType::Reject => EventKind::Reject,
            DecisionType::RequestReprocess => EventKind::RequestReprocess,
        }
    }

    pub fn from_event(event: EventKind) -> Option<Self> {
        match event {
            EventKind::Approve => Some(DecisionType::Approve),
            EventKind::Reject => Some(DecisionType::Reject),
            EventKind::RequestReprocess => Some(DecisionType::RequestReprocess),
            _ => None,
        }
    }
}

impl Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.event().fmt(f)
    }
}

/// Immutable record of one accepted decision.
///
/// `actor_role` is the role held when the decision was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub document_id: DocumentId,
    pub actor_id: PrincipalId,
    pub actor_role: Role,
    pub decision_type: DecisionType,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}
