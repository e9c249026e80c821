//! Role definitions.
//!
//! A principal holds exactly one role. The role carried by the principal at
//! the moment of an action is authoritative; it is snapshotted into every
//! decision and audit record so later role changes never rewrite history.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, CapabilitySet};

/// Role in the governance core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full access, including settings, user management and the audit trail.
    ///
    /// **Use Cases:**
    /// - Court IT administrators
    /// - Compliance officers exporting the audit trail
    Admin,

    /// Reviews AI-redacted documents and issues approve/reject/reprocess
    /// decisions.
    Reviewer,

    /// Issues decisions and publishes approved documents to the target
    /// system.
    Publisher,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Reviewer, Role::Publisher];

    /// Returns the closed capability set for this role.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Role::Admin => CapabilitySet::all(),
            Role::Reviewer | Role::Publisher => {
                CapabilitySet::from_slice(&[Capability::View, Capability::Decide])
            }
        }
    }

    /// Returns whether this role holds `capability`.
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Stable label used in exports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Reviewer => "Reviewer",
            Role::Publisher => "Publisher",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = lexguard_types::TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "reviewer" => Ok(Role::Reviewer),
            "publisher" => Ok(Role::Publisher),
            _ => Err(lexguard_types::TypeError::UnknownLabel {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}
