//! The governance facade: imperative shell around the pure kernel.
//!
//! Every entry point follows the same shape: resolve and authorize the
//! caller, run the pure step, then execute its effects with the audit
//! append first. A denied or failed attempt is audited before its error is
//! returned; if that audit write itself fails, the storage error wins.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use lexguard_audit::{
    ActionType, AuditLog, AuditRecord, AuditStorage, AuditTarget, InMemoryAuditStorage,
    OriginContext, TargetType,
};
use lexguard_config::{GovernanceSettings, LexguardConfig, ReviewConfig};
use lexguard_kernel::{
    DecisionType, Document, Effect, LifecycleEvent, LifecyclePolicy, NewDocument, Refusal,
    ReviewDecision, ScoreReport, Transition, TransitionError, TransitionRequest, TriageThresholds,
    kernel,
};
use lexguard_masking::MaskingRuleRegistry;
use lexguard_rbac::{Actor, Authorizer, Capability, Principal, Session, UserDirectory};
use lexguard_types::{Clock, ConfidenceScore, DocumentId, SystemClock};
use rayon::ThreadPool;
use tracing::{info, warn};

use crate::context::{Caller, RequestContext};
use crate::error::{GovernanceError, Result};

pub(crate) struct Inner {
    pub(crate) documents: RwLock<HashMap<DocumentId, Document>>,
    pub(crate) decisions: RwLock<HashMap<DocumentId, Vec<ReviewDecision>>>,
    pub(crate) audit: AuditLog,
    pub(crate) rules: RwLock<MaskingRuleRegistry>,
    pub(crate) settings: RwLock<GovernanceSettings>,
    pub(crate) directory: RwLock<UserDirectory>,
    pub(crate) triage: TriageThresholds,
    pub(crate) review: ReviewConfig,
    pub(crate) audit_page_size: usize,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) authorizer: Authorizer,
    pub(crate) bulk_pool: ThreadPool,
}

/// Builder for [`Governance`].
pub struct GovernanceBuilder {
    config: LexguardConfig,
    clock: Arc<dyn Clock>,
    storage: Arc<dyn AuditStorage>,
}

impl GovernanceBuilder {
    pub fn new(config: LexguardConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            storage: Arc::new(InMemoryAuditStorage::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit_storage(mut self, storage: Arc<dyn AuditStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn build(self) -> Result<Governance> {
        self.config.validate()?;

        let triage = TriageThresholds::new(
            self.config.triage.low_confidence_below,
            self.config.triage.requires_attention_below,
        );
        let bulk_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.review.bulk_parallelism)
            .thread_name(|i| format!("lexguard-bulk-{i}"))
            .build()
            .map_err(|e| GovernanceError::internal(format!("bulk pool: {e}")))?;
        let audit = AuditLog::open(self.storage, Arc::clone(&self.clock))?;

        info!(
            ai_confidence_threshold = self.config.settings.ai_confidence_threshold,
            auto_publish = self.config.settings.auto_publish_above_threshold,
            strict_redaction = self.config.settings.strict_redaction_mode,
            bulk_parallelism = self.config.review.bulk_parallelism,
            "governance core started"
        );

        Ok(Governance {
            inner: Arc::new(Inner {
                documents: RwLock::new(HashMap::new()),
                decisions: RwLock::new(HashMap::new()),
                audit,
                rules: RwLock::new(MaskingRuleRegistry::new()),
                settings: RwLock::new(self.config.settings),
                directory: RwLock::new(UserDirectory::new()),
                triage,
                review: self.config.review,
                audit_page_size: self.config.audit.page_size,
                clock: self.clock,
                authorizer: Authorizer::new(),
                bulk_pool,
            }),
        })
    }
}

/// Document governance core.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Governance {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for Governance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governance")
            .field("triage", &self.inner.triage)
            .field("review", &self.inner.review)
            .finish_non_exhaustive()
    }
}

impl Governance {
    /// Builds a core from `config` with the system clock and in-memory
    /// audit storage.
    pub fn new(config: LexguardConfig) -> Result<Self> {
        GovernanceBuilder::new(config).build()
    }

    pub fn builder(config: LexguardConfig) -> GovernanceBuilder {
        GovernanceBuilder::new(config)
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.inner.audit
    }

    pub fn triage_thresholds(&self) -> TriageThresholds {
        self.inner.triage
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Opens a session for an externally authenticated principal.
    ///
    /// Refused, and audited as a denied login, when the origin address is
    /// outside the allowlist or the user has been deactivated.
    pub fn open_session(&self, principal: Principal, origin: OriginContext) -> Result<Session> {
        let actor = Actor::Principal(principal.clone());
        let target = AuditTarget::new(TargetType::Session, principal.id.as_str());
        let settings = self.current_settings()?;
        let now = self.now();

        if !settings.allowed_ip_ranges.is_empty() {
            let allowed = origin
                .ip_address
                .as_deref()
                .and_then(|ip| ip.parse::<IpAddr>().ok())
                .is_some_and(|ip| settings.is_ip_allowed(ip));
            if !allowed {
                let reason = format!(
                    "origin {} is outside the allowed IP ranges",
                    origin.ip_address.as_deref().unwrap_or("unknown")
                );
                return Err(self.deny(&actor, ActionType::Login, target, &origin, reason));
            }
        }

        let login = self.write(&self.inner.directory)?.observe_login(&principal, now);
        if let Err(e) = login {
            return Err(self.deny(&actor, ActionType::Login, target, &origin, e.to_string()));
        }

        let timeout = Duration::minutes(i64::from(settings.session_timeout_minutes));
        let session = Session::open(principal, now, timeout);
        let origin = OriginContext {
            session_id: Some(session.session_id.to_string()),
            ..origin
        };
        self.inner.audit.append(
            AuditRecord::success(
                &actor,
                ActionType::Login,
                AuditTarget::new(TargetType::Session, session.session_id.to_string()),
                format!("session opened until {}", session.expires_at.to_rfc3339()),
            )
            .with_origin(origin),
        )?;

        info!(principal = %session.principal.id, role = %session.role(), "session opened");
        Ok(session)
    }

    // ========================================================================
    // Document lifecycle
    // ========================================================================

    /// Registers an uploaded document in `Uploaded` at version 1.
    pub fn upload(&self, ctx: &RequestContext, draft: NewDocument) -> Result<Document> {
        let id = DocumentId::generate();
        let target = AuditTarget::document(id);
        let actor = self.live_actor(ctx, ActionType::Upload, &target)?;

        match kernel::upload(id, draft, &actor, self.now()) {
            Ok(transition) => {
                let mut documents = self.write(&self.inner.documents)?;
                self.execute(transition.effects, &mut documents, &ctx.origin)?;
                info!(document = %id, actor = %audit_id(&actor), "document uploaded");
                Ok(transition.document)
            }
            Err(refusal) => Err(self.refuse(refusal, &ctx.origin)),
        }
    }

    /// The AI pipeline picked the document up.
    pub fn begin_processing(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        expected_version: u64,
    ) -> Result<Document> {
        self.submit(ctx, id, expected_version, LifecycleEvent::BeginProcessing, None)
    }

    /// AI scoring ingress. Moves the document to review, or straight to
    /// `Published` under the auto-publish rule.
    pub fn report_score(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        expected_version: u64,
        report: ScoreReport,
    ) -> Result<Document> {
        self.submit(
            ctx,
            id,
            expected_version,
            LifecycleEvent::ScoreReported(report),
            None,
        )
    }

    /// Records a human review decision.
    pub fn decide(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        expected_version: u64,
        decision: DecisionType,
        comment: Option<&str>,
    ) -> Result<Document> {
        let event = match decision {
            DecisionType::Approve => LifecycleEvent::Approve,
            DecisionType::Reject => LifecycleEvent::Reject,
            DecisionType::RequestReprocess => LifecycleEvent::RequestReprocess,
        };
        self.submit(ctx, id, expected_version, event, comment)
    }

    /// Releases an approved document.
    pub fn publish(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        expected_version: u64,
    ) -> Result<Document> {
        self.submit(ctx, id, expected_version, LifecycleEvent::Publish, None)
    }

    /// Returns a document, recording the view.
    pub fn view_document(&self, ctx: &RequestContext, id: DocumentId) -> Result<Document> {
        let target = AuditTarget::document(id);
        let actor = self.require(ctx, Capability::View, ActionType::View, &target)?;
        let document = self.snapshot(id)?;
        self.inner.audit.append(
            AuditRecord::success(
                &actor,
                ActionType::View,
                target,
                format!("viewed {} at version {}", document.file_name, document.version),
            )
            .with_origin(ctx.origin.clone()),
        )?;
        Ok(document)
    }

    /// Decision history of a document, oldest first.
    pub fn decisions_for(&self, ctx: &RequestContext, id: DocumentId) -> Result<Vec<ReviewDecision>> {
        let target = AuditTarget::document(id);
        self.require(ctx, Capability::View, ActionType::View, &target)?;
        self.snapshot(id)?;
        Ok(self
            .read(&self.inner.decisions)?
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    /// Runs one lifecycle event with optimistic concurrency.
    ///
    /// The kernel runs against a snapshot taken under a read lock. The
    /// write lock is held only to compare the stored version with the
    /// snapshot and to execute the effects.
    pub(crate) fn submit(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        expected_version: u64,
        event: LifecycleEvent,
        comment: Option<&str>,
    ) -> Result<Document> {
        let kind = event.kind();
        let target = AuditTarget::document(id);
        let actor = self.live_actor(ctx, kind.action_type(), &target)?;

        let snapshot = match self.snapshot(id) {
            Ok(doc) => doc,
            Err(e) => {
                return Err(self.fail(&actor, kind.action_type(), target, &ctx.origin, e));
            }
        };

        let mut request = TransitionRequest::new(expected_version, event, actor);
        if let Some(comment) = comment {
            request = request.with_comment(comment);
        }
        let policy = self.policy()?;
        let now = self.now();

        let transition = match kernel::transition(&snapshot, &request, &policy, now) {
            Ok(transition) => transition,
            Err(refusal) => return Err(self.refuse(refusal, &ctx.origin)),
        };

        let mut documents = self.write(&self.inner.documents)?;
        let stored_version = documents.get(&id).map_or(0, |doc| doc.version);
        if stored_version != snapshot.version {
            // Lost a race since the snapshot was taken
            drop(documents);
            let error = TransitionError::VersionConflict {
                document_id: id,
                expected: expected_version,
                actual: stored_version,
            };
            let audit = error.audit_record(&request.actor, kind.action_type(), id);
            return Err(self.refuse(Refusal { error, audit }, &ctx.origin));
        }

        let Transition { document, effects } = transition;
        self.execute(effects, &mut documents, &ctx.origin)?;
        drop(documents);

        info!(
            document = %id,
            event = %kind,
            state = %document.state,
            version = document.version,
            actor = %audit_id(&request.actor),
            "transition accepted"
        );
        Ok(document)
    }

    /// Executes kernel effects in order, stopping at the first failure.
    fn execute(
        &self,
        effects: Vec<Effect>,
        documents: &mut HashMap<DocumentId, Document>,
        origin: &OriginContext,
    ) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::AuditLogAppend(record) => {
                    self.inner.audit.append(record.with_origin(origin.clone()))?;
                }
                Effect::DocumentWrite(document) => {
                    documents.insert(document.id, document);
                }
                Effect::DecisionAppend(decision) => {
                    self.write(&self.inner.decisions)?
                        .entry(decision.document_id)
                        .or_default()
                        .push(decision);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn snapshot(&self, id: DocumentId) -> Result<Document> {
        self.read(&self.inner.documents)?
            .get(&id)
            .cloned()
            .ok_or_else(|| GovernanceError::NotFound(format!("document {id}")))
    }

    fn policy(&self) -> Result<LifecyclePolicy> {
        let settings = self.current_settings()?;
        let auto_publish_at = if settings.auto_publish_above_threshold {
            Some(
                ConfidenceScore::new(settings.ai_confidence_threshold)
                    .map_err(|e| GovernanceError::internal(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(LifecyclePolicy {
            triage: self.inner.triage,
            auto_publish_at,
        })
    }

    pub(crate) fn current_settings(&self) -> Result<GovernanceSettings> {
        Ok(self.read(&self.inner.settings)?.clone())
    }

    // ========================================================================
    // Authorization and refusal helpers
    // ========================================================================

    /// Resolves the caller to an actor whose session is live and whose
    /// account is active. Capability checks are left to the caller.
    pub(crate) fn live_actor(
        &self,
        ctx: &RequestContext,
        action: ActionType,
        target: &AuditTarget,
    ) -> Result<Actor> {
        let Caller::Session(session) = &ctx.caller else {
            return Ok(Actor::System);
        };
        let actor = ctx.claimed_actor();
        if let Err(e) = self.inner.authorizer.check_live(session, self.now()) {
            return Err(self.deny(&actor, action, target.clone(), &ctx.origin, e.to_string()));
        }
        let active = self
            .read(&self.inner.directory)?
            .is_active(&session.principal.id);
        if !active {
            let reason = format!("user {} is deactivated", session.principal.id);
            return Err(self.deny(&actor, action, target.clone(), &ctx.origin, reason));
        }
        Ok(actor)
    }

    /// Requires a live human session holding `capability`.
    pub(crate) fn require(
        &self,
        ctx: &RequestContext,
        capability: Capability,
        action: ActionType,
        target: &AuditTarget,
    ) -> Result<Actor> {
        let actor = self.live_actor(ctx, action, target)?;
        let Actor::Principal(principal) = &actor else {
            let reason = format!("{capability} requires a human principal");
            return Err(self.deny(&actor, action, target.clone(), &ctx.origin, reason));
        };
        if let Err(e) = self.inner.authorizer.check(principal, capability) {
            return Err(self.deny(&actor, action, target.clone(), &ctx.origin, e.to_string()));
        }
        Ok(actor)
    }

    /// Audits a denied attempt and returns the error to surface.
    pub(crate) fn deny(
        &self,
        actor: &Actor,
        action: ActionType,
        target: AuditTarget,
        origin: &OriginContext,
        reason: String,
    ) -> GovernanceError {
        warn!(actor = %audit_id(actor), action = %action, target = %target.target_id, %reason, "request denied");
        let record = AuditRecord::denied(actor, action, target, reason.clone()).with_origin(origin.clone());
        match self.inner.audit.append(record) {
            Ok(_) => GovernanceError::Forbidden(reason),
            Err(e) => e.into(),
        }
    }

    /// Audits a failed attempt and returns `error`.
    pub(crate) fn fail(
        &self,
        actor: &Actor,
        action: ActionType,
        target: AuditTarget,
        origin: &OriginContext,
        error: GovernanceError,
    ) -> GovernanceError {
        warn!(actor = %audit_id(actor), action = %action, target = %target.target_id, %error, "request failed");
        let record =
            AuditRecord::failed(actor, action, target, error.to_string()).with_origin(origin.clone());
        match self.inner.audit.append(record) {
            Ok(_) => error,
            Err(e) => e.into(),
        }
    }

    fn refuse(&self, refusal: Refusal, origin: &OriginContext) -> GovernanceError {
        warn!(
            action = %refusal.audit.action_type,
            target = %refusal.audit.target.target_id,
            error = %refusal.error,
            "transition refused"
        );
        match self.inner.audit.append(refusal.audit.with_origin(origin.clone())) {
            Ok(_) => refusal.error.into(),
            Err(e) => e.into(),
        }
    }

    pub(crate) fn read<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockReadGuard<'a, T>> {
        lock.read()
            .map_err(|_| GovernanceError::internal("lock poisoned"))
    }

    pub(crate) fn write<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockWriteGuard<'a, T>> {
        lock.write()
            .map_err(|_| GovernanceError::internal("lock poisoned"))
    }
}

pub(crate) fn audit_id(actor: &Actor) -> &str {
    match actor {
        Actor::System => "system",
        Actor::Principal(p) => p.id.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexguard_audit::{AuditFilter, OutcomeKind};
    use lexguard_kernel::{DocumentState, UploadSource};
    use lexguard_rbac::Role;
    use lexguard_types::{Language, ManualClock};

    fn fixture() -> (Governance, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gov = Governance::builder(LexguardConfig::default())
            .with_clock(clock.clone())
            .build()
            .unwrap();
        (gov, clock)
    }

    fn login(gov: &Governance, role: Role) -> RequestContext {
        let principal = Principal::new("u-7", "Sarah Johnson", role, Language::English);
        RequestContext::session(gov.open_session(principal, OriginContext::default()).unwrap())
    }

    fn draft() -> NewDocument {
        NewDocument::new("ruling.pdf", "SC-2024-002", Language::English, UploadSource::Manual)
    }

    #[test]
    fn upload_is_audited_with_session_origin() {
        let (gov, _) = fixture();
        let ctx = login(&gov, Role::Reviewer);
        let doc = gov.upload(&ctx, draft()).unwrap();
        assert_eq!(doc.state, DocumentState::Uploaded);

        let entries: Vec<_> = gov
            .audit_log()
            .query(AuditFilter::default().with_target(AuditTarget::document(doc.id)))
            .unwrap()
            .map(std::result::Result::unwrap)
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, ActionType::Upload);
        assert!(entries[0].origin.session_id.is_some());
    }

    #[test]
    fn expired_session_is_forbidden_and_audited() {
        let (gov, clock) = fixture();
        let ctx = login(&gov, Role::Admin);
        clock.advance(Duration::minutes(61));

        let err = gov.upload(&ctx, draft()).unwrap_err();
        assert!(err.is_forbidden());
        let denied = gov
            .audit_log()
            .count(&AuditFilter::default().with_outcome(OutcomeKind::Denied))
            .unwrap();
        assert_eq!(denied, 1);
    }

    #[test]
    fn unknown_document_is_not_found_and_audited() {
        let (gov, _) = fixture();
        let err = gov
            .begin_processing(&RequestContext::system(), DocumentId::generate(), 1)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotFound(_)));
        let failed = gov
            .audit_log()
            .count(&AuditFilter::default().with_outcome(OutcomeKind::Failed))
            .unwrap();
        assert_eq!(failed, 1);
    }

    #[test]
    fn view_requires_live_session() {
        let (gov, _) = fixture();
        let ctx = login(&gov, Role::Reviewer);
        let doc = gov.upload(&ctx, draft()).unwrap();
        assert!(gov.view_document(&RequestContext::system(), doc.id).is_err());
        assert_eq!(gov.view_document(&ctx, doc.id).unwrap().id, doc.id);
    }
}
