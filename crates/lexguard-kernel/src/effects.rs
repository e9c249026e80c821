//! Effects produced by the kernel.
//!
//! The kernel never executes effects. The runtime executes them in order
//! and stops at the first failure; the audit append always comes first, so
//! a failed audit write leaves no state change behind.

use lexguard_audit::AuditRecord;
use serde::{Deserialize, Serialize};

use crate::decision::ReviewDecision;
use crate::document::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Append an entry to the immutable audit log.
    AuditLogAppend(AuditRecord),

    /// Replace the stored document with this version.
    DocumentWrite(Document),

    /// Append to the document's decision history.
    DecisionAppend(ReviewDecision),
}
