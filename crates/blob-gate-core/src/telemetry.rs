// crates/blob-gate-core/src/telemetry.rs
// ============================================================================
// Module: Blob Gate Telemetry
// Description: Observability hooks for access requests and the decision cache.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A thin metrics interface for gateway outcomes, request latency, and
//! decision-cache behavior. Deployments plug in their own exporter; the
//! default [`NoopMetrics`] discards everything.
//! Security posture: metric events never carry tokens, capability URLs, or
//! principal identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

use crate::core::errors::ReasonCategory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for access request histograms.
pub const ACCESS_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Access request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcomeKind {
    /// A storage grant was issued.
    Granted,
    /// The request was rejected.
    Rejected,
}

impl AccessOutcomeKind {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Rejected => "rejected",
        }
    }
}

/// Access request metric event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessMetricEvent {
    /// Request outcome.
    pub outcome: AccessOutcomeKind,
    /// Rejection reason label when rejected.
    pub reason: Option<&'static str>,
    /// Rejection category when rejected.
    pub category: Option<ReasonCategory>,
    /// Gateway stage label at which the request finished.
    pub stage: &'static str,
}

/// Decision cache event.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEvent {
    /// Served from an unexpired cache entry.
    Hit,
    /// No entry; a new backend lookup was started.
    Miss,
    /// Joined a lookup already in flight.
    Coalesced,
    /// Entry found but expired; it was evicted.
    Expired,
    /// Entry evicted to respect the capacity bound.
    Evicted,
}

impl CacheEvent {
    /// Returns a stable label for the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Coalesced => "coalesced",
            Self::Expired => "expired",
            Self::Evicted => "evicted",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for gateway requests and the decision cache.
pub trait GatewayMetrics: Send + Sync {
    /// Records one finished access request and its latency.
    fn record_access(&self, event: AccessMetricEvent, latency: Duration);
    /// Records a decision cache event.
    fn record_cache(&self, event: CacheEvent);
}

/// No-op metrics sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl GatewayMetrics for NoopMetrics {
    fn record_access(&self, _event: AccessMetricEvent, _latency: Duration) {}

    fn record_cache(&self, _event: CacheEvent) {}
}

/// Returns the index of the latency bucket `latency` falls into.
///
/// Latencies above the last bucket map to `ACCESS_LATENCY_BUCKETS_MS.len()`.
#[must_use]
pub fn latency_bucket(latency: Duration) -> usize {
    let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    ACCESS_LATENCY_BUCKETS_MS
        .iter()
        .position(|bound| millis <= *bound)
        .unwrap_or(ACCESS_LATENCY_BUCKETS_MS.len())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ACCESS_LATENCY_BUCKETS_MS;
    use super::latency_bucket;

    #[test]
    fn latency_bucket_picks_first_upper_bound() {
        assert_eq!(latency_bucket(Duration::from_millis(0)), 0);
        assert_eq!(latency_bucket(Duration::from_millis(3)), 2);
        assert_eq!(latency_bucket(Duration::from_millis(100)), 6);
        assert_eq!(latency_bucket(Duration::from_secs(60)), ACCESS_LATENCY_BUCKETS_MS.len());
    }
}
