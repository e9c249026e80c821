//! Administrative surface: settings, users, masking rules and the audit
//! trail.
//!
//! Mutations stage the change, append the audit entry, and only then
//! publish the change, all under the owning write lock. A storage fault
//! therefore leaves state exactly as it was.

use std::io::Write;
use std::sync::PoisonError;

use lexguard_audit::{
    ActionType, AuditCursor, AuditFilter, AuditPage, AuditQueryIter, AuditRecord, AuditTarget,
};
use lexguard_config::{GovernanceSettings, SettingsUpdate};
use lexguard_masking::{
    MaskingRule, NewMaskingRule, RuleFilter, RulePatch, RuleSource,
};
use lexguard_rbac::{Actor, Capability, UserRecord};
use lexguard_types::{PrincipalId, RuleId};
use tracing::info;

use crate::context::RequestContext;
use crate::error::{GovernanceError, Result};
use crate::governance::{Governance, audit_id};

impl Governance {
    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self, ctx: &RequestContext) -> Result<GovernanceSettings> {
        self.require(ctx, Capability::View, ActionType::View, &AuditTarget::settings())?;
        self.current_settings()
    }

    /// Applies a partial settings update. The audit details list each
    /// changed field as `name: old -> new`.
    pub fn update_settings(
        &self,
        ctx: &RequestContext,
        update: &SettingsUpdate,
    ) -> Result<GovernanceSettings> {
        let target = AuditTarget::settings();
        let actor = self.require(
            ctx,
            Capability::ManageSettings,
            ActionType::SettingsChange,
            &target,
        )?;

        let mut settings = self.write(&self.inner.settings)?;
        let (next, changes) = match update.apply(&settings) {
            Ok(applied) => applied,
            Err(e) => {
                drop(settings);
                return Err(self.fail(&actor, ActionType::SettingsChange, target, &ctx.origin, e.into()));
            }
        };
        let details = if changes.is_empty() {
            "no changes".to_string()
        } else {
            changes.join("; ")
        };
        self.inner.audit.append(
            AuditRecord::success(&actor, ActionType::SettingsChange, target, details)
                .with_origin(ctx.origin.clone()),
        )?;
        *settings = next.clone();
        drop(settings);

        info!(actor = %audit_id(&actor), changed = changes.len(), "settings updated");
        Ok(next)
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub fn list_users(&self, ctx: &RequestContext) -> Result<Vec<UserRecord>> {
        let target = AuditTarget::new(lexguard_audit::TargetType::User, "*");
        self.require(ctx, Capability::ManageUsers, ActionType::View, &target)?;
        Ok(self.read(&self.inner.directory)?.list())
    }

    /// Deactivates a user. Their live sessions stop working immediately and
    /// they cannot log in again until reactivated.
    pub fn deactivate_user(&self, ctx: &RequestContext, id: &PrincipalId) -> Result<()> {
        self.set_user_active(ctx, id, false)
    }

    pub fn reactivate_user(&self, ctx: &RequestContext, id: &PrincipalId) -> Result<()> {
        self.set_user_active(ctx, id, true)
    }

    fn set_user_active(&self, ctx: &RequestContext, id: &PrincipalId, active: bool) -> Result<()> {
        let target = AuditTarget::user(id);
        let actor = self.require(ctx, Capability::ManageUsers, ActionType::Edit, &target)?;

        let mut directory = self.write(&self.inner.directory)?;
        let verb = if active { "reactivated" } else { "deactivated" };
        let details = directory
            .get(id)
            .map(|record| format!("{verb} user {} ({})", record.id, record.last_role));
        let Some(details) = details else {
            drop(directory);
            let error = GovernanceError::NotFound(format!("user {id}"));
            return Err(self.fail(&actor, ActionType::Edit, target, &ctx.origin, error));
        };
        self.inner.audit.append(
            AuditRecord::success(&actor, ActionType::Edit, target, details)
                .with_origin(ctx.origin.clone()),
        )?;
        if active {
            directory.reactivate(id)?;
        } else {
            directory.deactivate(id)?;
        }
        drop(directory);

        info!(actor = %audit_id(&actor), user = %id, active, "user status changed");
        Ok(())
    }

    // ========================================================================
    // Masking rules
    // ========================================================================

    /// Validates and stores a masking rule. Invalid rules are audited as
    /// failed and never stored.
    pub fn add_rule(&self, ctx: &RequestContext, draft: NewMaskingRule) -> Result<RuleId> {
        let pending = AuditTarget::new(lexguard_audit::TargetType::MaskingRule, "new");
        let actor = self.require(ctx, Capability::ManageSettings, ActionType::Edit, &pending)?;
        let created_by = principal_id(&actor)?;

        let mut rules = self.write(&self.inner.rules)?;
        let mut staged = rules.clone();
        let id = match staged.add_rule(draft, &created_by, self.now()) {
            Ok(id) => id,
            Err(e) => {
                drop(rules);
                return Err(self.fail(&actor, ActionType::Edit, pending, &ctx.origin, e.into()));
            }
        };
        let details = staged
            .get(id)
            .map_or_else(String::new, |rule| format!("added {}", rule.describe()));
        self.inner.audit.append(
            AuditRecord::success(&actor, ActionType::Edit, AuditTarget::rule(id), details)
                .with_origin(ctx.origin.clone()),
        )?;
        *rules = staged;
        drop(rules);

        info!(actor = %audit_id(&actor), rule = %id, "masking rule added");
        Ok(id)
    }

    pub fn update_rule(
        &self,
        ctx: &RequestContext,
        id: RuleId,
        patch: &RulePatch,
    ) -> Result<MaskingRule> {
        let target = AuditTarget::rule(id);
        let actor = self.require(ctx, Capability::ManageSettings, ActionType::Edit, &target)?;

        let mut rules = self.write(&self.inner.rules)?;
        let changes = rules.get(id).map(|rule| patch.changes(rule)).unwrap_or_default();
        let mut staged = rules.clone();
        let updated = match staged.update_rule(id, patch, self.now()) {
            Ok(rule) => rule,
            Err(e) => {
                drop(rules);
                return Err(self.fail(&actor, ActionType::Edit, target, &ctx.origin, e.into()));
            }
        };
        let details = if changes.is_empty() {
            "no changes".to_string()
        } else {
            changes.join("; ")
        };
        self.inner.audit.append(
            AuditRecord::success(&actor, ActionType::Edit, target, details)
                .with_origin(ctx.origin.clone()),
        )?;
        *rules = staged;
        drop(rules);

        info!(actor = %audit_id(&actor), rule = %id, "masking rule updated");
        Ok(updated)
    }

    pub fn remove_rule(&self, ctx: &RequestContext, id: RuleId) -> Result<MaskingRule> {
        let target = AuditTarget::rule(id);
        let actor = self.require(ctx, Capability::ManageSettings, ActionType::Delete, &target)?;

        let mut rules = self.write(&self.inner.rules)?;
        let mut staged = rules.clone();
        let removed = match staged.remove_rule(id) {
            Ok(rule) => rule,
            Err(e) => {
                drop(rules);
                return Err(self.fail(&actor, ActionType::Delete, target, &ctx.origin, e.into()));
            }
        };
        self.inner.audit.append(
            AuditRecord::success(
                &actor,
                ActionType::Delete,
                target,
                format!("removed {}", removed.describe()),
            )
            .with_origin(ctx.origin.clone()),
        )?;
        *rules = staged;
        drop(rules);

        info!(actor = %audit_id(&actor), rule = %id, "masking rule removed");
        Ok(removed)
    }

    pub fn list_rules(&self, ctx: &RequestContext, filter: &RuleFilter) -> Result<Vec<MaskingRule>> {
        let target = AuditTarget::new(lexguard_audit::TargetType::MaskingRule, "*");
        self.require(ctx, Capability::View, ActionType::View, &target)?;
        Ok(self.read(&self.inner.rules)?.list_rules(filter))
    }

    // ========================================================================
    // Audit trail
    // ========================================================================

    /// Lazy, restartable query over the audit trail, oldest first.
    pub fn query_audit(
        &self,
        ctx: &RequestContext,
        filter: AuditFilter,
    ) -> Result<AuditQueryIter<'_>> {
        self.require(ctx, Capability::ViewAudit, ActionType::View, &AuditTarget::audit_log())?;
        Ok(self.inner.audit.query(filter)?)
    }

    /// One page of the audit trail using the configured page size.
    pub fn audit_page(
        &self,
        ctx: &RequestContext,
        filter: &AuditFilter,
        cursor: Option<AuditCursor>,
    ) -> Result<AuditPage> {
        self.require(ctx, Capability::ViewAudit, ActionType::View, &AuditTarget::audit_log())?;
        Ok(self.inner.audit.page(filter, cursor, self.inner.audit_page_size)?)
    }

    /// Writes matching entries as CSV and returns the row count.
    ///
    /// The export is recorded before any row is written, so the export
    /// entry itself is part of an unfiltered export.
    pub fn export_audit_csv<W: Write>(
        &self,
        ctx: &RequestContext,
        filter: &AuditFilter,
        writer: W,
    ) -> Result<usize> {
        self.record_export(ctx, filter, "csv")?;
        Ok(self.inner.audit.export_csv(filter, writer)?)
    }

    pub fn export_audit_json<W: Write>(
        &self,
        ctx: &RequestContext,
        filter: &AuditFilter,
        writer: W,
    ) -> Result<usize> {
        self.record_export(ctx, filter, "json")?;
        Ok(self.inner.audit.export_json(filter, writer)?)
    }

    /// Recomputes the hash chain and returns the number of verified entries.
    pub fn verify_audit_chain(&self, ctx: &RequestContext) -> Result<usize> {
        self.require(ctx, Capability::ViewAudit, ActionType::View, &AuditTarget::audit_log())?;
        Ok(self.inner.audit.verify_chain()?)
    }

    fn record_export(&self, ctx: &RequestContext, filter: &AuditFilter, format: &str) -> Result<()> {
        let target = AuditTarget::audit_log();
        let actor = self.require(ctx, Capability::ViewAudit, ActionType::View, &target)?;
        if let Err(e) = filter.validate() {
            let error = GovernanceError::from(e);
            return Err(self.fail(&actor, ActionType::View, target, &ctx.origin, error));
        }
        self.inner.audit.append(
            AuditRecord::success(&actor, ActionType::View, target, format!("exported audit log as {format}"))
                .with_origin(ctx.origin.clone()),
        )?;
        info!(actor = %audit_id(&actor), format, "audit log exported");
        Ok(())
    }
}

/// Read interface for the redaction engine: rules in ascending id order
/// and the current strict redaction setting.
impl RuleSource for Governance {
    fn active_rules(&self) -> Vec<MaskingRule> {
        // Writers only publish fully staged registries.
        self.inner
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_rules()
    }

    fn strict_mode(&self) -> bool {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .strict_redaction_mode
    }
}

fn principal_id(actor: &Actor) -> Result<PrincipalId> {
    actor
        .principal()
        .map(|p| p.id.clone())
        .ok_or_else(|| GovernanceError::internal("rule changes require a principal"))
}
