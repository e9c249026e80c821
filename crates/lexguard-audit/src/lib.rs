//! Append-only audit trail for the governance core.
//!
//! # Architecture
//!
//! ```text
//! AuditLog = {
//!     storage: Arc<dyn AuditStorage>,   // Write-once entries
//!     head: (last LogId, last timestamp, last hash),
//!     append(record) -> LogId,
//!     page(filter, cursor, limit) -> AuditPage,
//!     query(filter) -> lazy iterator,
//!     export_csv(filter, writer),
//! }
//! ```
//!
//! Sequence ids and timestamps are assigned by the log under a single
//! lock, so the order of the trail is the order of acceptance, regardless
//! of the callers' clocks. Each entry carries the SHA-256 of its canonical
//! fields chained to its predecessor; [`AuditLog::verify_chain`] detects any
//! rewrite of stored history.
//!
//! The API exposes no mutation or deletion. Retention purges are an
//! administrative operation outside this crate.
//!
//! # Example
//!
//! ```
//! use lexguard_audit::{ActionType, AuditFilter, AuditLog, AuditRecord, AuditTarget};
//! use lexguard_rbac::{Actor, Principal, Role};
//! use lexguard_types::Language;
//!
//! let log = AuditLog::in_memory();
//! let admin = Principal::new("u-1", "Ahmed Mohammed", Role::Admin, Language::Arabic);
//!
//! let id = log
//!     .append(AuditRecord::success(
//!         &Actor::Principal(admin),
//!         ActionType::SettingsChange,
//!         AuditTarget::settings(),
//!         "aiConfidenceThreshold: 65 -> 70",
//!     ))
//!     .unwrap();
//!
//! let page = log.page(&AuditFilter::default().with_actor("u-1"), None, 10).unwrap();
//! assert_eq!(page.entries.len(), 1);
//! assert_eq!(page.entries[0].id, id);
//! ```

use lexguard_types::LogId;
use thiserror::Error;

mod chain;
pub mod entry;
pub mod export;
pub mod log;
pub mod storage;

pub use entry::{
    ActionType, AuditActor, AuditLogEntry, AuditOutcome, AuditRecord, AuditTarget, OriginContext,
    OutcomeKind, TargetType,
};
pub use log::{AuditCursor, AuditFilter, AuditLog, AuditPage, AuditQueryIter};
pub use storage::{AuditStorage, InMemoryAuditStorage, StorageError, StorageFault};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Audit chain broken at entry {id}")]
    ChainBroken { id: LogId },

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal audit error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
