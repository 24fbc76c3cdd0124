// crates/blob-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fixtures for blob-gate-core integration tests.
// Purpose: Build gateways over in-memory backends with deterministic time.
// Dependencies: blob-gate-core, ed25519-dalek
// ============================================================================

//! ## Overview
//! Provides a gateway fixture wired to counting in-memory backends, a manual
//! clock, and an in-memory audit sink, plus token and record builders.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared helpers are used selectively by each test binary."
)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blob_gate_core::ActionSet;
use blob_gate_core::BackendError;
use blob_gate_core::BrokerSettings;
use blob_gate_core::Gateway;
use blob_gate_core::GatewaySettings;
use blob_gate_core::InMemoryAuditSink;
use blob_gate_core::InMemoryGrantProvider;
use blob_gate_core::KeySetHandle;
use blob_gate_core::ManualClock;
use blob_gate_core::PermissionBackend;
use blob_gate_core::PermissionRecord;
use blob_gate_core::PermissionStore;
use blob_gate_core::PermissionStoreSettings;
use blob_gate_core::PrincipalId;
use blob_gate_core::ResourcePattern;
use blob_gate_core::ResourceRef;
use blob_gate_core::StorageBroker;
use blob_gate_core::Timestamp;
use blob_gate_core::TokenClaims;
use blob_gate_core::TokenSigner;
use blob_gate_core::TokenVerifier;
use blob_gate_core::VerificationKeys;
use blob_gate_core::VerifierSettings;
use ed25519_dalek::SigningKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed "now" for every fixture, in unix seconds.
pub const NOW_SECS: i64 = 1_800_000_000;
/// Trusted issuer.
pub const ISSUER: &str = "https://id.blob-gate.test";

// ============================================================================
// SECTION: Fixture
// ============================================================================

/// Gateway plus handles to everything it talks to.
pub struct Fixture {
    /// Gateway under test.
    pub gateway: Gateway,
    /// Signer trusted by the gateway.
    pub signer: TokenSigner,
    /// Manual clock shared by every component.
    pub clock: ManualClock,
    /// Grant provider with call counters.
    pub provider: Arc<InMemoryGrantProvider>,
    /// Audit records.
    pub audit: Arc<InMemoryAuditSink>,
}

impl Fixture {
    /// Mints a token for `subject` expiring `ttl_secs` after the fixture clock start.
    pub fn token_for(&self, subject: &str, ttl_secs: i64) -> String {
        self.signer.sign(&TokenClaims::new(subject, ISSUER, NOW_SECS + ttl_secs)).unwrap()
    }
}

/// Builds a fixture over `backend` with default settings.
pub fn fixture(backend: Arc<dyn PermissionBackend>, objects: &[&str]) -> Fixture {
    fixture_with(backend, objects, PermissionStoreSettings::default(), GatewaySettings::default())
}

/// Builds a fixture over `backend` with explicit store and gateway settings.
pub fn fixture_with(
    backend: Arc<dyn PermissionBackend>,
    objects: &[&str],
    store_settings: PermissionStoreSettings,
    gateway_settings: GatewaySettings,
) -> Fixture {
    let clock = ManualClock::new(Timestamp::from_unix_seconds(NOW_SECS));
    let signer = TokenSigner::new(SigningKey::from_bytes(&[42; 32]), None);
    let verifier = TokenVerifier::new(
        KeySetHandle::new(VerificationKeys::new(vec![signer.verification_key()])),
        VerifierSettings::new([ISSUER]),
    );
    let store = PermissionStore::new(backend, Arc::new(clock.clone()), store_settings);
    let provider = Arc::new(InMemoryGrantProvider::with_objects(
        objects.iter().map(|raw| ResourceRef::parse(raw).unwrap()),
    ));
    let broker =
        StorageBroker::new(provider.clone(), Arc::new(clock.clone()), BrokerSettings::default());
    let audit = Arc::new(InMemoryAuditSink::default());
    let gateway =
        Gateway::new(verifier, store, broker, Arc::new(clock.clone()), gateway_settings)
            .with_audit(audit.clone());
    Fixture {
        gateway,
        signer,
        clock,
        provider,
        audit,
    }
}

/// Builds a permission record updated at the fixture start.
pub fn record(principal: &str, pattern: &str, actions: ActionSet) -> PermissionRecord {
    PermissionRecord {
        principal_id: PrincipalId::from(principal),
        resource_pattern: ResourcePattern::parse(pattern).unwrap(),
        actions,
        expires_at: None,
        updated_at: Timestamp::from_unix_seconds(NOW_SECS),
    }
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Backend that outlives every deadline.
pub struct HangingBackend;

#[async_trait]
impl PermissionBackend for HangingBackend {
    async fn fetch_records(
        &self,
        _principal_id: &PrincipalId,
        _resource: &ResourceRef,
    ) -> Result<Vec<PermissionRecord>, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}
