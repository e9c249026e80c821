#![allow(clippy::match_same_arms)]
//! Capability types for authorization.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A named permission granted per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read documents, the review queue and rule listings.
    View,

    /// Approve, reject, or request reprocessing of a document, and publish
    /// approved documents.
    Decide,

    /// Change administrative settings and masking rules.
    ///
    /// **Security Impact:**
    /// - Alters auto-publish behaviour and redaction coverage
    /// - Every change is audited with before/after values
    ManageSettings,

    /// Deactivate or reactivate users.
    ManageUsers,

    /// Query and export the audit trail.
    ViewAudit,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 5] = [
        Capability::View,
        Capability::Decide,
        Capability::ManageSettings,
        Capability::ManageUsers,
        Capability::ViewAudit,
    ];

    /// Returns whether this capability is high-risk.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Capability::ManageSettings | Capability::ManageUsers)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Decide => "decide",
            Capability::ManageSettings => "manage_settings",
            Capability::ManageUsers => "manage_users",
            Capability::ViewAudit => "view_audit",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Capability::View => 1 << 0,
            Capability::Decide => 1 << 1,
            Capability::ManageSettings => 1 << 2,
            Capability::ManageUsers => 1 << 3,
            Capability::ViewAudit => 1 << 4,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of capabilities granted to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::from_slice(&Capability::ALL)
    }

    pub fn from_slice(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |acc, c| acc | c.bit()))
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns whether any capability in the set is high-risk.
    pub fn has_high_risk_capability(&self) -> bool {
        self.iter().any(|c| c.is_high_risk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_high_risk() {
        assert!(!Capability::View.is_high_risk());
        assert!(!Capability::Decide.is_high_risk());
        assert!(Capability::ManageSettings.is_high_risk());
        assert!(Capability::ManageUsers.is_high_risk());
        assert!(!Capability::ViewAudit.is_high_risk());
    }

    #[test]
    fn test_capability_set_operations() {
        let set = CapabilitySet::from_slice(&[Capability::View, Capability::View]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(Capability::View));
        assert!(!set.contains(Capability::Decide));
        assert!(!set.has_high_risk_capability());

        let all = CapabilitySet::all();
        assert_eq!(all.len(), Capability::ALL.len());
        assert!(all.has_high_risk_capability());
        assert_eq!(all.iter().collect::<Vec<_>>(), Capability::ALL.to_vec());

        assert!(CapabilitySet::empty().is_empty());
    }
}
