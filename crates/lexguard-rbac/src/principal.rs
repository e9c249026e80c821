//! Authenticated principals and the sessions opened for them.

use chrono::{DateTime, Duration, Utc};
use lexguard_types::{Language, PrincipalId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// An externally verified identity.
///
/// The core performs no credential checks; it trusts a principal once the
/// identity provider has issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub display_name: String,
    pub role: Role,
    /// Interface language preference, passed per request rather than held
    /// as ambient state.
    pub language: Language,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        language: Language,
    ) -> Self {
        Self {
            id: PrincipalId::new(id),
            display_name: display_name.into(),
            role,
            language,
        }
    }
}

/// A principal bound to a validity window.
///
/// Authorization is always evaluated against the role carried here, and
/// only while the session is live. An expired session is refused outright,
/// so no role data outlives the identity token's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Opens a session valid for `timeout` from `issued_at`.
    pub fn open(principal: Principal, issued_at: DateTime<Utc>, timeout: Duration) -> Self {
        assert!(timeout > Duration::zero(), "session timeout must be positive");
        Self {
            session_id: Uuid::new_v4(),
            principal,
            issued_at,
            expires_at: issued_at + timeout,
        }
    }

    /// Returns `true` once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }
}

/// Who performed an action: a human principal, or the governance core
/// itself acting on behalf of the AI pipeline or an automatic rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    System,
    Principal(Principal),
}

impl Actor {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::System => None,
            Actor::Principal(p) => Some(p),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }
}

impl From<Principal> for Actor {
    fn from(principal: Principal) -> Self {
        Actor::Principal(principal)
    }
}
