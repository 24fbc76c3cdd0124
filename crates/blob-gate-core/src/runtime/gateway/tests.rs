// crates/blob-gate-core/src/runtime/gateway/tests.rs
// ============================================================================
// Module: Gateway Tests
// Description: Unit tests for stage tracking, auditing, and deadlines.
// Purpose: Validate that each request ends in one typed outcome and one record.
// Dependencies: blob-gate-core, ed25519-dalek, tokio
// ============================================================================

//! ## Overview
//! Drives the gateway over in-memory backends and checks the stage reported
//! with each rejection plus the audit and metric side effects.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;

use super::*;
use crate::audit::InMemoryAuditSink;
use crate::core::action::Action;
use crate::core::decision::DenyReason;
use crate::core::errors::ReasonCategory;
use crate::core::identifiers::PrincipalId;
use crate::core::permission::PermissionRecord;
use crate::core::permission::ResourcePattern;
use crate::core::time::ManualClock;
use crate::core::time::Timestamp;
use crate::interfaces::BackendError;
use crate::interfaces::PermissionBackend;
use crate::runtime::broker::BrokerSettings;
use crate::runtime::memory::InMemoryGrantProvider;
use crate::runtime::memory::StaticPermissionBackend;
use crate::runtime::permissions::PermissionStoreSettings;
use crate::runtime::verifier::KeySetHandle;
use crate::runtime::verifier::TokenClaims;
use crate::runtime::verifier::TokenSigner;
use crate::runtime::verifier::VerificationKeys;
use crate::runtime::verifier::VerifierSettings;
use crate::telemetry::CacheEvent;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const NOW_SECS: i64 = 1_800_000_000;
const ISSUER: &str = "https://issuer.test";

struct Harness {
    gateway: Gateway,
    signer: TokenSigner,
    provider: Arc<InMemoryGrantProvider>,
    audit: Arc<InMemoryAuditSink>,
    metrics: Arc<RecordingMetrics>,
}

#[derive(Default)]
struct RecordingMetrics {
    events: Mutex<Vec<AccessMetricEvent>>,
}

impl GatewayMetrics for RecordingMetrics {
    fn record_access(&self, event: AccessMetricEvent, _latency: Duration) {
        self.events.lock().unwrap().push(event);
    }

    fn record_cache(&self, _event: CacheEvent) {}
}

/// Backend that never answers.
struct HangingBackend;

#[async_trait]
impl PermissionBackend for HangingBackend {
    async fn fetch_records(
        &self,
        _principal_id: &PrincipalId,
        _resource: &ResourceRef,
    ) -> Result<Vec<PermissionRecord>, BackendError> {
        std::future::pending().await
    }
}

fn record(pattern: &str, actions: ActionSet) -> PermissionRecord {
    PermissionRecord {
        principal_id: PrincipalId::from("user-1"),
        resource_pattern: ResourcePattern::parse(pattern).unwrap(),
        actions,
        expires_at: None,
        updated_at: Timestamp::from_unix_seconds(NOW_SECS),
    }
}

fn harness_with(backend: Arc<dyn PermissionBackend>, settings: GatewaySettings) -> Harness {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_seconds(NOW_SECS)));
    let signer = TokenSigner::new(SigningKey::from_bytes(&[3; 32]), None);
    let verifier = TokenVerifier::new(
        KeySetHandle::new(VerificationKeys::new(vec![signer.verification_key()])),
        VerifierSettings::new([ISSUER]),
    );
    let store = PermissionStore::new(backend, clock.clone(), PermissionStoreSettings::default());
    let provider = Arc::new(InMemoryGrantProvider::with_objects([
        ResourceRef::parse("docs/report.pdf").unwrap(),
    ]));
    let broker = StorageBroker::new(provider.clone(), clock.clone(), BrokerSettings::default());
    let audit = Arc::new(InMemoryAuditSink::default());
    let metrics = Arc::new(RecordingMetrics::default());
    let gateway = Gateway::new(verifier, store, broker, clock, settings)
        .with_audit(audit.clone())
        .with_metrics(metrics.clone());
    Harness {
        gateway,
        signer,
        provider,
        audit,
        metrics,
    }
}

fn harness(records: Vec<PermissionRecord>) -> Harness {
    harness_with(Arc::new(StaticPermissionBackend::new(records)), GatewaySettings::default())
}

impl Harness {
    fn token(&self) -> String {
        self.signer.sign(&TokenClaims::new("user-1", ISSUER, NOW_SECS + 3600)).unwrap()
    }
}

fn rejection(outcome: &AccessOutcome) -> &Rejection {
    outcome.rejection().expect("expected rejection")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn granted_request_reports_granted_stage_and_audits_once() {
    let h = harness(vec![record("docs/*", ActionSet::only(Action::Read))]);
    let request = AccessRequest::new(h.token(), "docs/report.pdf", ActionSet::only(Action::Read))
        .with_request_id("req-7");

    let outcome = h.gateway.request_access(request).await;
    let grant = outcome.grant().expect("expected grant");
    assert_eq!(grant.actions, ActionSet::only(Action::Read));

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, "granted");
    assert_eq!(records[0].stage, "granted");
    assert_eq!(records[0].request_id.as_deref(), Some("req-7"));
    assert_eq!(records[0].principal_id.as_deref(), Some("user-1"));
    assert_eq!(records[0].grant_expires_at, Some(grant.expires_at));
    assert!(records[0].token_fingerprint.is_some());
    assert_eq!(h.metrics.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_resource_rejected_after_verification() {
    let h = harness(Vec::new());
    let outcome = h
        .gateway
        .request_access(AccessRequest::new(h.token(), "../etc/passwd", ActionSet::only(Action::Read)))
        .await;
    let rejection = rejection(&outcome);
    assert!(matches!(rejection.reason, RejectionReason::InvalidResource(_)));
    assert_eq!(rejection.stage, GatewayStage::Verified);
    assert_eq!(h.audit.len(), 1);
}

#[tokio::test]
async fn bad_token_hides_request_validation_errors() {
    let h = harness(Vec::new());
    let outcome = h
        .gateway
        .request_access(AccessRequest::new("garbage", "../etc/passwd", ActionSet::EMPTY))
        .await;
    let rejection = rejection(&outcome);
    assert!(matches!(rejection.reason, RejectionReason::MalformedToken(_)));
    assert_eq!(rejection.stage, GatewayStage::Received);
}

#[tokio::test]
async fn empty_actions_rejected_after_verification() {
    let h = harness(Vec::new());
    let outcome =
        h.gateway.request_access(AccessRequest::new(h.token(), "a.txt", ActionSet::EMPTY)).await;
    let rejection = rejection(&outcome);
    assert!(matches!(rejection.reason, RejectionReason::InvalidRequest(_)));
    assert_eq!(rejection.stage, GatewayStage::Verified);
}

#[tokio::test]
async fn bad_token_rejected_at_received_with_fingerprint() {
    let h = harness(vec![record("*", ActionSet::ALL)]);
    let outcome = h
        .gateway
        .request_access(AccessRequest::new("not-a-token", "a.txt", ActionSet::only(Action::Read)))
        .await;
    let rejection = rejection(&outcome);
    assert!(matches!(rejection.reason, RejectionReason::MalformedToken(_)));
    assert_eq!(rejection.stage, GatewayStage::Received);
    assert_eq!(rejection.reason.category(), ReasonCategory::Authentication);
    let records = h.audit.records();
    assert_eq!(records[0].principal_id, None);
    assert_eq!(records[0].token_fingerprint.as_deref().map(str::len), Some(64));
}

#[tokio::test]
async fn deny_rejected_at_verified_without_provider_calls() {
    let h = harness(Vec::new());
    let outcome = h
        .gateway
        .request_access(AccessRequest::new(h.token(), "docs/report.pdf", ActionSet::only(Action::Read)))
        .await;
    let rejection = rejection(&outcome);
    assert_eq!(rejection.reason, RejectionReason::Denied(DenyReason::NoMatchingRecord));
    assert_eq!(rejection.stage, GatewayStage::Verified);
    assert_eq!(h.provider.total_calls(), 0);
    assert_eq!(h.audit.records()[0].reason_detail.as_deref(), Some("no_matching_record"));
}

#[tokio::test]
async fn partial_overlap_grants_subset() {
    let h = harness(vec![record("docs/*", ActionSet::only(Action::Read))]);
    let requested = ActionSet::only(Action::Read).with(Action::Delete);
    let outcome =
        h.gateway.request_access(AccessRequest::new(h.token(), "docs/report.pdf", requested)).await;
    let grant = outcome.grant().expect("expected grant");
    assert_eq!(grant.actions, ActionSet::only(Action::Read));
    assert!(grant.capability(Action::Delete).is_none());
    let records = h.audit.records();
    assert_eq!(records[0].requested_actions, requested);
    assert_eq!(records[0].granted_actions, ActionSet::only(Action::Read));
}

#[tokio::test]
async fn no_overlap_is_action_not_permitted() {
    let h = harness(vec![record("docs/*", ActionSet::only(Action::Read))]);
    let outcome = h
        .gateway
        .request_access(AccessRequest::new(h.token(), "docs/report.pdf", ActionSet::only(Action::Write)))
        .await;
    assert_eq!(
        rejection(&outcome).reason,
        RejectionReason::Denied(DenyReason::ActionNotPermitted)
    );
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn missing_object_rejected_at_authorized() {
    let h = harness(vec![record("*", ActionSet::ALL)]);
    let outcome = h
        .gateway
        .request_access(AccessRequest::new(h.token(), "docs/gone.pdf", ActionSet::only(Action::Read)))
        .await;
    let rejection = rejection(&outcome);
    assert_eq!(rejection.reason, RejectionReason::ResourceNotFound("docs/gone.pdf".to_string()));
    assert_eq!(rejection.stage, GatewayStage::Authorized);
    assert!(!rejection.reason.is_retryable());
}

#[tokio::test]
async fn request_deadline_yields_timeout_at_reached_stage() {
    let settings = GatewaySettings {
        request_timeout: Duration::from_millis(30),
    };
    let h = harness_with(Arc::new(HangingBackend), settings);
    let outcome = h
        .gateway
        .request_access(AccessRequest::new(h.token(), "a.txt", ActionSet::only(Action::Read)))
        .await;
    let rejection = rejection(&outcome);
    assert_eq!(rejection.reason, RejectionReason::Timeout);
    assert_eq!(rejection.stage, GatewayStage::Verified);
    assert!(rejection.reason.is_retryable());
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reason, Some("timeout"));
    assert_eq!(records[0].category, Some(ReasonCategory::Infrastructure));
    let events = h.metrics.events.lock().unwrap();
    assert_eq!(events[0].stage, "verified");
    assert_eq!(events[0].reason, Some("timeout"));
}
