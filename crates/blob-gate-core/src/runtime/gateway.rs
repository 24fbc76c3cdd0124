// crates/blob-gate-core/src/runtime/gateway.rs
// ============================================================================
// Module: Blob Gate Authorization Gateway
// Description: Verify, authorize, and grant for one access request.
// Purpose: Compose the verifier, permission store, and broker; fail closed.
// Dependencies: tokio, crate::{audit, core, runtime, telemetry}
// ============================================================================

//! ## Overview
//! The gateway drives one request through `Received -> Verified ->
//! Authorized -> Granted`, exiting early with a typed rejection from any
//! stage. A grant is only requested after an Allow decision, and only for
//! the intersection of the requested and allowed actions. A partial overlap
//! is granted as the overlapping subset.
//!
//! Every request emits exactly one audit record and one metric event. The
//! gateway never retries and never panics across its boundary; a request
//! deadline bounds all steps together.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;

use crate::audit::AccessAuditRecord;
use crate::audit::AuditSink;
use crate::audit::NoopAuditSink;
use crate::core::action::ActionSet;
use crate::core::decision::AuthDecision;
use crate::core::errors::AuthError;
use crate::core::errors::RejectionReason;
use crate::core::grant::StorageGrant;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::ResourceRef;
use crate::core::principal::Principal;
use crate::core::time::Clock;
use crate::runtime::broker::StorageBroker;
use crate::runtime::permissions::PermissionStore;
use crate::runtime::verifier::TokenVerifier;
use crate::runtime::verifier::token_fingerprint;
use crate::telemetry::AccessMetricEvent;
use crate::telemetry::AccessOutcomeKind;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default deadline for one access request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Inbound access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Raw bearer token.
    pub token: String,
    /// Resource reference as presented by the caller.
    pub resource: String,
    /// Requested actions.
    pub actions: ActionSet,
    /// Requested grant lifetime.
    pub ttl: Option<Duration>,
    /// Caller-supplied correlation id.
    pub request_id: Option<RequestId>,
}

impl AccessRequest {
    /// Builds a request with no TTL or request id.
    #[must_use]
    pub fn new(token: impl Into<String>, resource: impl Into<String>, actions: ActionSet) -> Self {
        Self {
            token: token.into(),
            resource: resource.into(),
            actions,
            ttl: None,
            request_id: None,
        }
    }

    /// Returns the request with a grant lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns the request with a correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(RequestId::new(request_id));
        self
    }
}

/// Last stage a request reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStage {
    /// Request accepted; token not yet verified.
    #[default]
    Received,
    /// Token verified.
    Verified,
    /// Authorization allowed a non-empty action set.
    Authorized,
    /// Grant issued.
    Granted,
}

impl GatewayStage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Verified => "verified",
            Self::Authorized => "authorized",
            Self::Granted => "granted",
        }
    }
}

/// Typed refusal returned instead of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Why the request was refused.
    pub reason: RejectionReason,
    /// Last stage reached before the refusal.
    pub stage: GatewayStage,
}

/// Result of one access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessOutcome {
    /// Grant issued.
    Granted(StorageGrant),
    /// Request refused.
    Rejected(Rejection),
}

impl AccessOutcome {
    /// Returns the grant, if issued.
    #[must_use]
    pub const fn grant(&self) -> Option<&StorageGrant> {
        match self {
            Self::Granted(grant) => Some(grant),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the rejection, if refused.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Granted(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Gateway tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Deadline covering verification, authorization, and grant issuance.
    pub request_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// What a request established before it finished; feeds the audit record.
#[derive(Debug, Default)]
struct Progress {
    /// Last stage reached.
    stage: GatewayStage,
    /// Verified principal.
    principal: Option<Principal>,
    /// Actions authorized for the grant.
    granted: ActionSet,
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Authorization gateway.
pub struct Gateway {
    /// Token verifier.
    verifier: TokenVerifier,
    /// Permission store.
    permissions: PermissionStore,
    /// Storage broker.
    broker: StorageBroker,
    /// Time source for token checks and audit timestamps.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn GatewayMetrics>,
    /// Tuning.
    settings: GatewaySettings,
}

impl Gateway {
    /// Builds a gateway with no-op audit and metrics sinks.
    #[must_use]
    pub fn new(
        verifier: TokenVerifier,
        permissions: PermissionStore,
        broker: StorageBroker,
        clock: Arc<dyn Clock>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            verifier,
            permissions,
            broker,
            clock,
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(NoopMetrics),
            settings,
        }
    }

    /// Returns the gateway with an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the gateway with a metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the token verifier (for key rotation).
    #[must_use]
    pub const fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Returns the permission store (for invalidation and stats).
    #[must_use]
    pub const fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    /// Runs one access request to a grant or a typed rejection.
    pub async fn request_access(&self, request: AccessRequest) -> AccessOutcome {
        let started = Instant::now();
        let mut progress = Progress::default();
        let result =
            tokio::time::timeout(self.settings.request_timeout, self.run(&request, &mut progress))
                .await
                .unwrap_or(Err(RejectionReason::Timeout));
        let outcome = match result {
            Ok(grant) => AccessOutcome::Granted(grant),
            Err(reason) => AccessOutcome::Rejected(Rejection {
                reason,
                stage: progress.stage,
            }),
        };
        let latency = started.elapsed();
        self.audit.record(&self.audit_record(&request, &progress, &outcome, latency));
        self.metrics.record_access(metric_event(&outcome), latency);
        outcome
    }

    /// Executes the stages, recording progress as each one completes.
    async fn run(
        &self,
        request: &AccessRequest,
        progress: &mut Progress,
    ) -> Result<StorageGrant, RejectionReason> {
        let principal = self.verifier.verify(&request.token, self.clock.now())?;
        progress.principal = Some(principal.clone());
        progress.stage = GatewayStage::Verified;

        let resource = ResourceRef::parse(&request.resource).map_err(AuthError::from)?;
        if request.actions.is_empty() {
            return Err(RejectionReason::InvalidRequest("no actions requested".to_string()));
        }

        let decision = self.permissions.decision(&principal, &resource).await?;
        let granted = match decision.narrow(request.actions) {
            AuthDecision::Allow(granted) => granted,
            AuthDecision::Deny(reason) => return Err(RejectionReason::Denied(reason)),
        };
        progress.granted = granted;
        progress.stage = GatewayStage::Authorized;

        let grant = self.broker.grant(&resource, granted, request.ttl).await?;
        progress.stage = GatewayStage::Granted;
        Ok(grant)
    }

    /// Builds the audit record for a finished request.
    fn audit_record(
        &self,
        request: &AccessRequest,
        progress: &Progress,
        outcome: &AccessOutcome,
        latency: Duration,
    ) -> AccessAuditRecord {
        let (outcome_label, stage, granted_actions, grant_expires_at) = match outcome {
            AccessOutcome::Granted(grant) => (
                AccessOutcomeKind::Granted,
                GatewayStage::Granted,
                grant.actions,
                Some(grant.expires_at),
            ),
            AccessOutcome::Rejected(rejection) => {
                (AccessOutcomeKind::Rejected, rejection.stage, ActionSet::EMPTY, None)
            }
        };
        let rejection = outcome.rejection();
        let token_fingerprint = progress
            .principal
            .as_ref()
            .map(|principal| principal.token_fingerprint().to_string())
            .or_else(|| (!request.token.is_empty()).then(|| token_fingerprint(&request.token)));
        AccessAuditRecord {
            event: "access_request",
            timestamp_ms: self.clock.now(),
            request_id: request.request_id.as_ref().map(|id| id.as_str().to_string()),
            outcome: outcome_label.as_str(),
            stage: stage.as_str(),
            principal_id: progress
                .principal
                .as_ref()
                .map(|principal| principal.subject().as_str().to_string()),
            issuer: progress.principal.as_ref().map(|principal| principal.issuer().to_string()),
            token_fingerprint,
            resource: request.resource.clone(),
            requested_actions: request.actions,
            granted_actions,
            reason: rejection.map(|rejection| rejection.reason.label()),
            reason_detail: rejection.and_then(|rejection| reason_detail(&rejection.reason)),
            category: rejection.map(|rejection| rejection.reason.category()),
            grant_expires_at,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Returns the free-form detail of a rejection, if it carries one.
fn reason_detail(reason: &RejectionReason) -> Option<String> {
    match reason {
        RejectionReason::Denied(deny) => Some(deny.as_str().to_string()),
        RejectionReason::MalformedToken(detail)
        | RejectionReason::UntrustedIssuer(detail)
        | RejectionReason::StoreUnavailable(detail)
        | RejectionReason::ProviderUnavailable(detail)
        | RejectionReason::ResourceNotFound(detail)
        | RejectionReason::InvalidResource(detail)
        | RejectionReason::InvalidRequest(detail) => Some(detail.clone()),
        RejectionReason::InvalidSignature
        | RejectionReason::Expired
        | RejectionReason::InvalidAudience
        | RejectionReason::Timeout => None,
    }
}

/// Builds the metric event for a finished request.
fn metric_event(outcome: &AccessOutcome) -> AccessMetricEvent {
    match outcome {
        AccessOutcome::Granted(_) => AccessMetricEvent {
            outcome: AccessOutcomeKind::Granted,
            reason: None,
            category: None,
            stage: GatewayStage::Granted.as_str(),
        },
        AccessOutcome::Rejected(rejection) => AccessMetricEvent {
            outcome: AccessOutcomeKind::Rejected,
            reason: Some(rejection.reason.label()),
            category: Some(rejection.reason.category()),
            stage: rejection.stage.as_str(),
        },
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
