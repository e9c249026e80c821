//! Authorization enforcement.
//!
//! Every mutating entry point of the governance core calls into the
//! [`Authorizer`] before any side effect.

use chrono::{DateTime, Utc};
use lexguard_types::PrincipalId;
use thiserror::Error;
use tracing::{info, warn};

use crate::capabilities::Capability;
use crate::principal::{Principal, Session};
use crate::roles::Role;

/// Error type for authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The principal's role does not hold the capability.
    #[error("{principal} ({role}) lacks the {capability} capability")]
    Forbidden {
        principal: PrincipalId,
        role: Role,
        capability: Capability,
    },

    /// The session expired before the request.
    #[error("session for {principal} expired at {expired_at}")]
    SessionExpired {
        principal: PrincipalId,
        expired_at: DateTime<Utc>,
    },

    /// The user has been deactivated by an administrator.
    #[error("user {0} is deactivated")]
    UserDeactivated(PrincipalId),

    /// The user is not present in the directory.
    #[error("user {0} is not known to the directory")]
    UnknownUser(PrincipalId),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthorizationError>;

/// Returns whether `principal` holds `capability`.
pub fn authorize(principal: &Principal, capability: Capability) -> bool {
    principal.role.has(capability)
}

/// Authorization engine.
///
/// Stateless apart from its logging switch: the capability table is fixed
/// and the role is read from the principal on every call.
#[derive(Debug, Clone)]
pub struct Authorizer {
    log_decisions: bool,
}

impl Authorizer {
    pub fn new() -> Self {
        Self {
            log_decisions: true,
        }
    }

    /// Disables decision logging (for testing).
    pub fn without_logging(mut self) -> Self {
        self.log_decisions = false;
        self
    }

    /// Checks that `principal` holds `capability`.
    pub fn check(&self, principal: &Principal, capability: Capability) -> Result<()> {
        let allowed = authorize(principal, capability);

        if self.log_decisions {
            if allowed {
                info!(
                    principal = %principal.id,
                    role = %principal.role,
                    capability = %capability,
                    "capability granted"
                );
            } else {
                warn!(
                    principal = %principal.id,
                    role = %principal.role,
                    capability = %capability,
                    "capability denied"
                );
            }
        }

        if allowed {
            Ok(())
        } else {
            Err(AuthorizationError::Forbidden {
                principal: principal.id.clone(),
                role: principal.role,
                capability,
            })
        }
    }

    /// Checks a live session for `capability` at instant `now`.
    ///
    /// Expiry is checked first: an expired session is refused regardless of
    /// its role.
    pub fn check_session<'s>(
        &self,
        session: &'s Session,
        capability: Capability,
        now: DateTime<Utc>,
    ) -> Result<&'s Principal> {
        let principal = self.check_live(session, now)?;
        self.check(principal, capability)?;
        Ok(principal)
    }

    /// Checks only that `session` has not expired at `now`.
    ///
    /// Used where the capability check happens downstream (lifecycle
    /// events are authorized by the kernel).
    pub fn check_live<'s>(&self, session: &'s Session, now: DateTime<Utc>) -> Result<&'s Principal> {
        if session.is_expired(now) {
            if self.log_decisions {
                warn!(
                    principal = %session.principal.id,
                    expired_at = %session.expires_at,
                    "session expired"
                );
            }
            return Err(AuthorizationError::SessionExpired {
                principal: session.principal.id.clone(),
                expired_at: session.expires_at,
            });
        }
        Ok(&session.principal)
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new()
    }
}
