//! Shared fixtures for governance integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use lexguard::{
    Document, Governance, InMemoryAuditStorage, Language, LexguardConfig, ManualClock,
    NewDocument, OriginContext, Principal, RequestContext, Role, ScoreReport, UploadSource,
};

pub struct Fixture {
    pub gov: Governance,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<InMemoryAuditStorage>,
}

pub fn fixture() -> Fixture {
    fixture_with(LexguardConfig::default())
}

pub fn fixture_with(config: LexguardConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let storage = Arc::new(InMemoryAuditStorage::new());
    let gov = Governance::builder(config)
        .with_clock(clock.clone())
        .with_audit_storage(storage.clone())
        .build()
        .expect("governance should build");
    Fixture {
        gov,
        clock,
        storage,
    }
}

pub fn principal(id: &str, role: Role) -> Principal {
    Principal::new(id, format!("User {id}"), role, Language::English)
}

pub fn login(gov: &Governance, id: &str, role: Role) -> RequestContext {
    let session = gov
        .open_session(principal(id, role), OriginContext::default())
        .expect("login should succeed");
    RequestContext::session(session)
}

pub fn draft(case: &str) -> NewDocument {
    NewDocument::new(
        format!("{case}.pdf"),
        case,
        Language::English,
        UploadSource::Manual,
    )
}

/// Uploads a document and drives it to the state the score implies.
pub fn scored(gov: &Governance, ctx: &RequestContext, case: &str, score: i64) -> Document {
    let system = RequestContext::system();
    let doc = gov.upload(ctx, draft(case)).expect("upload");
    let doc = gov
        .begin_processing(&system, doc.id, doc.version)
        .expect("begin processing");
    gov.report_score(&system, doc.id, doc.version, ScoreReport::new(score))
        .expect("report score")
}
