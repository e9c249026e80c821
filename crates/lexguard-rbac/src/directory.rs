//! Directory of principals seen by the governance core.
//!
//! Identities are owned by the external identity provider; the directory
//! only tracks whether an administrator has suspended a user and which
//! role was last presented.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lexguard_types::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::enforcement::{AuthorizationError, Result};
use crate::principal::Principal;
use crate::roles::Role;

/// What the directory knows about one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: PrincipalId,
    pub display_name: String,
    /// Role presented at the most recent login.
    pub last_role: Role,
    pub active: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UserDirectory {
    users: BTreeMap<PrincipalId, UserRecord>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a login by `principal`, creating the record on first sight.
    ///
    /// Fails with [`AuthorizationError::UserDeactivated`] for a suspended
    /// user; the record is left untouched in that case.
    pub fn observe_login(&mut self, principal: &Principal, now: DateTime<Utc>) -> Result<()> {
        match self.users.get_mut(&principal.id) {
            Some(record) if !record.active => {
                Err(AuthorizationError::UserDeactivated(principal.id.clone()))
            }
            Some(record) => {
                record.display_name.clone_from(&principal.display_name);
                record.last_role = principal.role;
                record.last_seen = now;
                Ok(())
            }
            None => {
                self.users.insert(
                    principal.id.clone(),
                    UserRecord {
                        id: principal.id.clone(),
                        display_name: principal.display_name.clone(),
                        last_role: principal.role,
                        active: true,
                        first_seen: now,
                        last_seen: now,
                    },
                );
                Ok(())
            }
        }
    }

    /// Returns `false` only for users an administrator has suspended.
    pub fn is_active(&self, id: &PrincipalId) -> bool {
        self.users.get(id).is_none_or(|r| r.active)
    }

    pub fn deactivate(&mut self, id: &PrincipalId) -> Result<()> {
        self.set_active(id, false)
    }

    pub fn reactivate(&mut self, id: &PrincipalId) -> Result<()> {
        self.set_active(id, true)
    }

    fn set_active(&mut self, id: &PrincipalId, active: bool) -> Result<()> {
        let record = self
            .users
            .get_mut(id)
            .ok_or_else(|| AuthorizationError::UnknownUser(id.clone()))?;
        record.active = active;
        Ok(())
    }

    pub fn get(&self, id: &PrincipalId) -> Option<&UserRecord> {
        self.users.get(id)
    }

    /// All users, ordered by id.
    pub fn list(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lexguard_types::Language;

    #[test]
    fn test_login_creates_and_refreshes_record() {
        let mut directory = UserDirectory::new();
        let t0 = Utc::now();
        let reviewer = Principal::new("u-7", "Mohammed Khaled", Role::Reviewer, Language::Arabic);

        directory.observe_login(&reviewer, t0).unwrap();
        assert_eq!(directory.len(), 1);

        // Same user, new role presented by the identity provider
        let publisher = Principal {
            role: Role::Publisher,
            ..reviewer.clone()
        };
        directory
            .observe_login(&publisher, t0 + Duration::hours(1))
            .unwrap();

        let record = directory.get(&reviewer.id).unwrap();
        assert_eq!(record.last_role, Role::Publisher);
        assert_eq!(record.first_seen, t0);
        assert_eq!(record.last_seen, t0 + Duration::hours(1));
    }

    #[test]
    fn test_deactivated_user_cannot_log_in() {
        let mut directory = UserDirectory::new();
        let now = Utc::now();
        let user = Principal::new("u-9", "Sarah Johnson", Role::Reviewer, Language::English);
        directory.observe_login(&user, now).unwrap();

        directory.deactivate(&user.id).unwrap();
        assert!(!directory.is_active(&user.id));
        assert_eq!(
            directory.observe_login(&user, now),
            Err(AuthorizationError::UserDeactivated(user.id.clone()))
        );

        directory.reactivate(&user.id).unwrap();
        assert!(directory.observe_login(&user, now).is_ok());
    }

    #[test]
    fn test_unknown_user_operations_fail() {
        let mut directory = UserDirectory::new();
        let ghost = PrincipalId::new("ghost");
        assert!(directory.is_active(&ghost));
        assert_eq!(
            directory.deactivate(&ghost),
            Err(AuthorizationError::UnknownUser(ghost.clone()))
        );
    }
}
