//! Audit entry types.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use lexguard_rbac::{Actor, Role};
use lexguard_types::{DocumentId, Hash, LogId, PrincipalId, RuleId};
use serde::{Deserialize, Serialize};

/// Closed set of audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    View,
    Approve,
    Reject,
    Upload,
    Edit,
    Delete,
    Login,
    SettingsChange,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::View => "view",
            ActionType::Approve => "approve",
            ActionType::Reject => "reject",
            ActionType::Upload => "upload",
            ActionType::Edit => "edit",
            ActionType::Delete => "delete",
            ActionType::Login => "login",
            ActionType::SettingsChange => "settings",
        }
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor snapshot taken when the entry is written.
///
/// The role is copied, never looked up later, so a subsequent role change
/// cannot alter recorded history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditActor {
    /// The governance core itself (AI pipeline ingress, automatic publish).
    System,
    Principal { id: PrincipalId, role: Role },
}

impl AuditActor {
    pub fn id(&self) -> &str {
        match self {
            AuditActor::System => "system",
            AuditActor::Principal { id, .. } => id.as_str(),
        }
    }

    pub fn role_label(&self) -> &'static str {
        match self {
            AuditActor::System => "System",
            AuditActor::Principal { role, .. } => role.as_str(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuditActor::System => None,
            AuditActor::Principal { role, .. } => Some(*role),
        }
    }
}

impl From<&Actor> for AuditActor {
    fn from(actor: &Actor) -> Self {
        match actor {
            Actor::System => AuditActor::System,
            Actor::Principal(p) => AuditActor::Principal {
                id: p.id.clone(),
                role: p.role,
            },
        }
    }
}

/// Kind of object an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Document,
    MaskingRule,
    Settings,
    User,
    AuditLog,
    Session,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Document => "document",
            TargetType::MaskingRule => "masking_rule",
            TargetType::Settings => "settings",
            TargetType::User => "user",
            TargetType::AuditLog => "audit_log",
            TargetType::Session => "session",
        }
    }
}

/// Polymorphic reference to the object acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditTarget {
    pub target_type: TargetType,
    pub target_id: String,
}

impl AuditTarget {
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
        }
    }

    pub fn document(id: DocumentId) -> Self {
        Self::new(TargetType::Document, id.to_string())
    }

    pub fn rule(id: RuleId) -> Self {
        Self::new(TargetType::MaskingRule, id.to_string())
    }

    pub fn settings() -> Self {
        Self::new(TargetType::Settings, "governance")
    }

    pub fn user(id: &PrincipalId) -> Self {
        Self::new(TargetType::User, id.as_str())
    }

    pub fn audit_log() -> Self {
        Self::new(TargetType::AuditLog, "audit")
    }
}

/// Caller-supplied network/session metadata. Opaque to the core apart from
/// the IP allowlist check at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginContext {
    pub ip_address: Option<String>,
    pub session_id: Option<String>,
}

impl OriginContext {
    pub fn new(ip_address: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            session_id: Some(session_id.into()),
        }
    }

    pub fn from_ip(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            session_id: None,
        }
    }
}

impl Display for OriginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.ip_address, &self.session_id) {
            (Some(ip), Some(session)) => write!(f, "ip={ip} session={session}"),
            (Some(ip), None) => write!(f, "ip={ip}"),
            (None, Some(session)) => write!(f, "session={session}"),
            (None, None) => Ok(()),
        }
    }
}

/// Whether the recorded attempt took effect.
///
/// Denied and failed attempts are recorded too, so "attempted but refused"
/// is distinguishable from "never attempted".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    /// Refused by authorization.
    Denied { reason: String },
    /// Rejected by a lifecycle or validation guard.
    Failed { reason: String },
}

impl AuditOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AuditOutcome::Success => OutcomeKind::Success,
            AuditOutcome::Denied { .. } => OutcomeKind::Denied,
            AuditOutcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AuditOutcome::Success => None,
            AuditOutcome::Denied { reason } | AuditOutcome::Failed { reason } => Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuditOutcome::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    Denied,
    Failed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Denied => "denied",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// An entry awaiting acceptance by the log.
///
/// Id, timestamp and chain hashes are assigned by
/// [`crate::AuditLog::append`]; callers cannot supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: AuditActor,
    pub action_type: ActionType,
    pub target: AuditTarget,
    pub details: String,
    pub origin: OriginContext,
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn success(
        actor: &Actor,
        action_type: ActionType,
        target: AuditTarget,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor: AuditActor::from(actor),
            action_type,
            target,
            details: details.into(),
            origin: OriginContext::default(),
            outcome: AuditOutcome::Success,
        }
    }

    pub fn denied(
        actor: &Actor,
        action_type: ActionType,
        target: AuditTarget,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            actor: AuditActor::from(actor),
            action_type,
            target,
            details: format!("denied: {reason}"),
            origin: OriginContext::default(),
            outcome: AuditOutcome::Denied { reason },
        }
    }

    pub fn failed(
        actor: &Actor,
        action_type: ActionType,
        target: AuditTarget,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            actor: AuditActor::from(actor),
            action_type,
            target,
            details: format!("failed: {reason}"),
            origin: OriginContext::default(),
            outcome: AuditOutcome::Failed { reason },
        }
    }

    pub fn with_origin(mut self, origin: OriginContext) -> Self {
        self.origin = origin;
        self
    }
}

/// A single accepted audit entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: LogId,
    /// Server-assigned, strictly increasing with `id`.
    pub timestamp: DateTime<Utc>,
    pub actor: AuditActor,
    pub action_type: ActionType,
    pub target: AuditTarget,
    pub details: String,
    pub origin: OriginContext,
    pub outcome: AuditOutcome,
    /// Hash of the preceding entry ([`Hash::GENESIS`] for the first).
    pub prev_hash: Hash,
    pub entry_hash: Hash,
}

impl AuditLogEntry {
    pub fn refers_to(&self, target: &AuditTarget) -> bool {
        &self.target == target
    }
}
