//! # Lexguard
//!
//! Document governance core for AI-assisted legal redaction.
//!
//! Documents move from upload through AI scoring and triage to a human
//! review decision and publication. Every step is role-gated and leaves an
//! entry in a hash-chained audit trail:
//!
//! - **Pure lifecycle kernel** - Guards run before any side effect
//! - **Optimistic concurrency** - Stale writers get `VersionConflict`
//! - **Audit first** - No state change without its audit entry
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Governance                          │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌────────┐  │
//! │  │   RBAC   │ → │  Kernel   │ → │  Audit   │ → │ Store  │  │
//! │  │(session) │   │(pure FSM) │   │ (chain)  │   │ (docs) │  │
//! │  └──────────┘   └───────────┘   └──────────┘   └────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use lexguard::{Governance, LexguardConfig, RequestContext};
//! use lexguard::{Language, NewDocument, OriginContext, Principal, Role, UploadSource};
//!
//! let gov = Governance::new(LexguardConfig::default())?;
//! let reviewer = Principal::new("u-1", "Sarah Johnson", Role::Reviewer, Language::English);
//! let session = gov.open_session(reviewer, OriginContext::default())?;
//! let ctx = RequestContext::session(session);
//!
//! let draft = NewDocument::new("ruling.pdf", "SC-2024-001", Language::English, UploadSource::Manual);
//! let doc = gov.upload(&ctx, draft)?;
//! assert_eq!(doc.version, 1);
//! # Ok::<(), lexguard::GovernanceError>(())
//! ```

mod admin;
mod context;
mod dashboard;
mod error;
mod governance;
mod review;

pub use context::{Caller, RequestContext};
pub use dashboard::{CONFIDENCE_BANDS, Overview, ReviewerStats};
pub use error::{GovernanceError, Result, ValidationFailure};
pub use governance::{Governance, GovernanceBuilder};
pub use review::{BulkItem, PendingItem, ReviewFilter, ReviewPage, ReviewSort};

// Re-export the domain vocabulary callers need
pub use lexguard_audit::{
    ActionType, AuditActor, AuditCursor, AuditFilter, AuditLog, AuditLogEntry, AuditOutcome,
    AuditPage, AuditQueryIter, AuditStorage, AuditTarget, InMemoryAuditStorage, OriginContext,
    OutcomeKind, StorageFault, TargetType,
};
pub use lexguard_config::{GovernanceSettings, LexguardConfig, SettingsUpdate};
pub use lexguard_kernel::{
    DecisionType, Document, DocumentState, NewDocument, Priority, ReviewDecision, ScoreReport,
    TriageBucket, UploadSource,
};
pub use lexguard_masking::{
    MaskingRule, NewMaskingRule, RuleCategory, RuleFilter, RuleLanguage, RulePatch, RuleSource,
};
pub use lexguard_rbac::{Principal, Role, Session, UserRecord};
pub use lexguard_types::{Clock, DocumentId, Language, ManualClock, PrincipalId, RuleId, SystemClock};
