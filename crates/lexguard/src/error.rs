//! Error types for the governance facade.

use std::time::Duration;

use lexguard_audit::{AuditError, StorageError};
use lexguard_config::ConfigError;
use lexguard_kernel::{DocumentState, EventKind, TransitionError};
use lexguard_masking::ValidationError;
use lexguard_rbac::AuthorizationError;
use lexguard_types::DocumentId;
use thiserror::Error;

/// Malformed input rejected before persistence.
#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error(transparent)]
    Rule(#[from] ValidationError),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    Transition(TransitionError),

    #[error("Invalid query: {0}")]
    Query(String),
}

/// Errors surfaced by [`crate::Governance`].
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Authorization failure. Not retryable.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The event is illegal from the document's current state; the caller
    /// must re-read the document.
    #[error("Document {document_id}: {event} is not allowed from {state}")]
    InvalidTransition {
        document_id: DocumentId,
        state: DocumentState,
        event: EventKind,
    },

    /// The caller's version is stale. Reload and retry.
    #[error("Document {document_id} changed: expected version {expected}, stored {actual}")]
    VersionConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// The audit store could not persist; nothing was changed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GovernanceError {
    pub fn internal(msg: impl Into<String>) -> Self {
        GovernanceError::Internal(msg.into())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, GovernanceError::Forbidden(_))
    }

    /// Whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GovernanceError::VersionConflict { .. }
                | GovernanceError::StorageUnavailable(_)
                | GovernanceError::Timeout(_)
        )
    }
}

impl From<TransitionError> for GovernanceError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Forbidden { .. } => GovernanceError::Forbidden(e.to_string()),
            TransitionError::InvalidTransition {
                document_id,
                state,
                event,
            } => GovernanceError::InvalidTransition {
                document_id,
                state,
                event,
            },
            TransitionError::VersionConflict {
                document_id,
                expected,
                actual,
            } => GovernanceError::VersionConflict {
                document_id,
                expected,
                actual,
            },
            TransitionError::ScoreOutOfRange(_) => {
                GovernanceError::Validation(ValidationFailure::Transition(e))
            }
        }
    }
}

impl From<AuthorizationError> for GovernanceError {
    fn from(e: AuthorizationError) -> Self {
        match e {
            AuthorizationError::UnknownUser(_) => GovernanceError::NotFound(e.to_string()),
            _ => GovernanceError::Forbidden(e.to_string()),
        }
    }
}

impl From<StorageError> for GovernanceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unavailable(reason) => GovernanceError::StorageUnavailable(reason),
            StorageError::Timeout(after) => GovernanceError::Timeout(after),
        }
    }
}

impl From<AuditError> for GovernanceError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Storage(storage) => storage.into(),
            AuditError::InvalidQuery(reason) => {
                GovernanceError::Validation(ValidationFailure::Query(reason))
            }
            AuditError::Io(io) => GovernanceError::Internal(format!("export I/O: {io}")),
            other => GovernanceError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for GovernanceError {
    fn from(e: ValidationError) -> Self {
        GovernanceError::Validation(ValidationFailure::Rule(e))
    }
}

impl From<ConfigError> for GovernanceError {
    fn from(e: ConfigError) -> Self {
        GovernanceError::Validation(ValidationFailure::Settings(e))
    }
}

/// Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
