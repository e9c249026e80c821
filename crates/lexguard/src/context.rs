//! Per-request context.
//!
//! Caller identity and origin travel with each request instead of living
//! in ambient state.

use lexguard_audit::OriginContext;
use lexguard_rbac::{Actor, Session};

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// The governance core acting for the AI pipeline or an integration.
    System,
    Session(Session),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub caller: Caller,
    pub origin: OriginContext,
}

impl RequestContext {
    pub fn system() -> Self {
        Self {
            caller: Caller::System,
            origin: OriginContext::default(),
        }
    }

    /// Context for a request made within `session`. The session id is
    /// recorded in the origin of every audit entry.
    pub fn session(session: Session) -> Self {
        let origin = OriginContext {
            ip_address: None,
            session_id: Some(session.session_id.to_string()),
        };
        Self {
            caller: Caller::Session(session),
            origin,
        }
    }

    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.origin.ip_address = Some(ip_address.into());
        self
    }

    /// The actor as recorded in audit entries, without any liveness check.
    pub(crate) fn claimed_actor(&self) -> Actor {
        match &self.caller {
            Caller::System => Actor::System,
            Caller::Session(session) => Actor::Principal(session.principal.clone()),
        }
    }
}
