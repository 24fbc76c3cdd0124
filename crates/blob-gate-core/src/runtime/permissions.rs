// crates/blob-gate-core/src/runtime/permissions.rs
// ============================================================================
// Module: Blob Gate Permission Store
// Description: Cached, deduplicated authorization decisions over a remote backend.
// Purpose: Answer "may principal P do A on R" without stampeding the database.
// Dependencies: tokio, crate::{core, interfaces, telemetry}
// ============================================================================

//! ## Overview
//! The permission store resolves authorization decisions from permission
//! records held in a remote document database. Decisions are cached per
//! `(principal, resource)` and concurrent misses for the same key share one
//! backend read.
//!
//! Invariants:
//! - A cache entry never outlives the cache TTL, the token expiry of the
//!   principal that produced it, or the expiry of the record it came from.
//! - Expired entries are evicted, never extended.
//! - Backend failures are never cached.
//! - At most one backend read is in flight per key; its result is delivered
//!   to every waiter and the in-flight entry is removed exactly once.
//!
//! Each lookup runs as its own task, so a caller that gives up (for example
//! because its request deadline elapsed) never strands the in-flight entry.
//! The cache mutex is never held across an `.await`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::core::action::Action;
use crate::core::action::ActionSet;
use crate::core::decision::AuthDecision;
use crate::core::errors::AuthError;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ResourceRef;
use crate::core::permission::resolve_records;
use crate::core::principal::Principal;
use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::interfaces::PermissionBackend;
use crate::telemetry::CacheEvent;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default decision cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
/// Default bound on one backend read.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
/// Default cache capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Permission store tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionStoreSettings {
    /// Upper bound on how long a decision is served from cache.
    pub cache_ttl: Duration,
    /// Upper bound on one backend read.
    pub lookup_timeout: Duration,
    /// Maximum cached decisions. Zero disables caching.
    pub max_entries: usize,
}

impl Default for PermissionStoreSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached decisions, including ones that expired but were not yet evicted.
    pub entries: usize,
    /// Keys with a backend read in flight.
    pub in_flight: usize,
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Cache key.
type CacheKey = (PrincipalId, ResourceRef);

/// Result fanned out to every waiter of one lookup.
type LookupResult = Result<AuthDecision, AuthError>;

/// Cached decision with its absolute expiry.
#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    /// Cached decision.
    decision: AuthDecision,
    /// Instant after which the entry must not be served.
    expires_at: Timestamp,
}

/// Lookup currently in flight for one key.
struct InFlight {
    /// Identifies the lookup that owns this entry.
    generation: u64,
    /// Channel the result is published on.
    sender: broadcast::Sender<LookupResult>,
}

/// Cache and in-flight table, guarded by one mutex.
#[derive(Default)]
struct StoreState {
    /// Cached decisions.
    entries: HashMap<CacheKey, CachedDecision>,
    /// Lookups in flight.
    in_flight: HashMap<CacheKey, InFlight>,
    /// Next lookup generation.
    next_generation: u64,
}

impl StoreState {
    /// Removes the in-flight entry for `key` if it still belongs to `generation`.
    fn finish_flight(&mut self, key: &CacheKey, generation: u64) {
        if self.in_flight.get(key).is_some_and(|flight| flight.generation == generation) {
            self.in_flight.remove(key);
        }
    }

    /// Inserts a cache entry, making room when the cache is full. Returns the
    /// number of live entries evicted for capacity.
    fn insert_entry(
        &mut self,
        key: CacheKey,
        entry: CachedDecision,
        now: Timestamp,
        max_entries: usize,
    ) -> usize {
        if max_entries == 0 {
            return 0;
        }
        let mut evicted = 0;
        if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
            self.entries.retain(|_, cached| cached.expires_at > now);
            while self.entries.len() >= max_entries {
                let Some(victim) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.expires_at)
                    .map(|(victim, _)| victim.clone())
                else {
                    break;
                };
                self.entries.remove(&victim);
                evicted += 1;
            }
        }
        self.entries.insert(key, entry);
        evicted
    }
}

/// Shared store internals, owned jointly by the store and its lookup tasks.
struct StoreInner {
    /// Permission record source.
    backend: Arc<dyn PermissionBackend>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Tuning.
    settings: PermissionStoreSettings,
    /// Cache event sink.
    metrics: Arc<dyn GatewayMetrics>,
    /// Cache and in-flight table.
    state: Mutex<StoreState>,
}

impl StoreInner {
    /// Locks the shared state.
    fn lock_state(&self) -> Result<MutexGuard<'_, StoreState>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("permission cache lock poisoned".to_string()))
    }

    /// Performs one bounded backend read and resolves it into a decision and
    /// the instant the decision may be cached until.
    async fn resolve(
        &self,
        key: &CacheKey,
        principal_expiry: Timestamp,
    ) -> Result<(AuthDecision, Timestamp), AuthError> {
        let fetched = tokio::time::timeout(
            self.settings.lookup_timeout,
            self.backend.fetch_records(&key.0, &key.1),
        )
        .await;
        let records = match fetched {
            Err(_) => {
                return Err(AuthError::StoreUnavailable("permission lookup timed out".to_string()));
            }
            Ok(Err(err)) => return Err(AuthError::StoreUnavailable(err.to_string())),
            Ok(Ok(records)) => records,
        };
        let now = self.clock.now();
        let resolution = resolve_records(&records, &key.0, &key.1, now);
        let mut cache_until = now.saturating_add(self.settings.cache_ttl).min(principal_expiry);
        if let Some(record_expiry) = resolution.valid_until {
            cache_until = cache_until.min(record_expiry);
        }
        Ok((resolution.decision, cache_until))
    }

    /// Runs one lookup to completion and publishes the result.
    async fn run_lookup(
        self: Arc<Self>,
        key: CacheKey,
        generation: u64,
        principal_expiry: Timestamp,
        sender: broadcast::Sender<LookupResult>,
    ) {
        let mut guard = FlightGuard {
            inner: Arc::clone(&self),
            key: key.clone(),
            generation,
            armed: true,
        };
        let outcome = self.resolve(&key, principal_expiry).await;
        let mut evicted = 0;
        let result = match outcome {
            Ok((decision, cache_until)) => {
                let now = self.clock.now();
                if let Ok(mut state) = self.state.lock() {
                    if cache_until > now {
                        evicted = state.insert_entry(
                            key.clone(),
                            CachedDecision {
                                decision,
                                expires_at: cache_until,
                            },
                            now,
                            self.settings.max_entries,
                        );
                    }
                    state.finish_flight(&key, generation);
                    guard.armed = false;
                }
                Ok(decision)
            }
            Err(err) => {
                if let Ok(mut state) = self.state.lock() {
                    state.finish_flight(&key, generation);
                    guard.armed = false;
                }
                Err(err)
            }
        };
        for _ in 0 .. evicted {
            self.metrics.record_cache(CacheEvent::Evicted);
        }
        let _ = sender.send(result);
    }
}

/// Removes the in-flight entry if the lookup task unwinds before completing.
struct FlightGuard {
    /// Shared store internals.
    inner: Arc<StoreInner>,
    /// Key of the owned lookup.
    key: CacheKey,
    /// Generation of the owned lookup.
    generation: u64,
    /// Cleared once the entry has been removed normally.
    armed: bool,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = match self.inner.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.finish_flight(&self.key, self.generation);
    }
}

// ============================================================================
// SECTION: Permission Store
// ============================================================================

/// Cached, deduplicated permission decisions.
///
/// Clones share the same cache.
#[derive(Clone)]
pub struct PermissionStore {
    /// Shared internals.
    inner: Arc<StoreInner>,
}

impl PermissionStore {
    /// Builds a store over `backend`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn PermissionBackend>,
        clock: Arc<dyn Clock>,
        settings: PermissionStoreSettings,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                clock,
                settings,
                metrics: Arc::new(NoopMetrics),
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Builds a store that reports cache events to `metrics`.
    #[must_use]
    pub fn with_metrics(
        backend: Arc<dyn PermissionBackend>,
        clock: Arc<dyn Clock>,
        settings: PermissionStoreSettings,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                clock,
                settings,
                metrics,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Returns the store settings.
    #[must_use]
    pub fn settings(&self) -> PermissionStoreSettings {
        self.inner.settings
    }

    /// Returns the full decision for `principal` on `resource`.
    ///
    /// Serves an unexpired cache entry when present; otherwise joins or starts
    /// the single backend read for the key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] when the backend read fails or
    /// exceeds the lookup timeout.
    pub async fn decision(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
    ) -> Result<AuthDecision, AuthError> {
        let key = (principal.subject().clone(), resource.clone());
        let (mut receiver, events) = {
            let mut state = self.inner.lock_state()?;
            let now = self.inner.clock.now();
            let mut events = Vec::with_capacity(2);
            match state.entries.get(&key) {
                Some(cached) if cached.expires_at > now => {
                    let decision = cached.decision;
                    drop(state);
                    self.inner.metrics.record_cache(CacheEvent::Hit);
                    return Ok(decision);
                }
                Some(_) => {
                    state.entries.remove(&key);
                    events.push(CacheEvent::Expired);
                }
                None => {}
            }
            let receiver = if let Some(flight) = state.in_flight.get(&key) {
                events.push(CacheEvent::Coalesced);
                flight.sender.subscribe()
            } else {
                events.push(CacheEvent::Miss);
                let (sender, receiver) = broadcast::channel(1);
                let generation = state.next_generation;
                state.next_generation = state.next_generation.wrapping_add(1);
                state.in_flight.insert(
                    key.clone(),
                    InFlight {
                        generation,
                        sender: sender.clone(),
                    },
                );
                tokio::spawn(Arc::clone(&self.inner).run_lookup(
                    key,
                    generation,
                    principal.expires_at(),
                    sender,
                ));
                receiver
            };
            (receiver, events)
        };
        for event in events {
            self.inner.metrics.record_cache(event);
        }
        receiver.recv().await.unwrap_or_else(|_| {
            Err(AuthError::StoreUnavailable("permission lookup aborted".to_string()))
        })
    }

    /// Returns the decision narrowed to one action: `Allow({action})` or a
    /// deny.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] when the backend read fails.
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        action: Action,
    ) -> Result<AuthDecision, AuthError> {
        let decision = self.decision(principal, resource).await?;
        Ok(decision.narrow(ActionSet::only(action)))
    }

    /// Drops the cached decision for one key. Returns true when an entry was
    /// removed.
    pub fn invalidate(&self, principal_id: &PrincipalId, resource: &ResourceRef) -> bool {
        let Ok(mut state) = self.inner.state.lock() else {
            return false;
        };
        state.entries.remove(&(principal_id.clone(), resource.clone())).is_some()
    }

    /// Drops every cached decision for a principal. Returns the number removed.
    pub fn invalidate_principal(&self, principal_id: &PrincipalId) -> usize {
        let Ok(mut state) = self.inner.state.lock() else {
            return 0;
        };
        let before = state.entries.len();
        state.entries.retain(|(principal, _), _| principal != principal_id);
        before - state.entries.len()
    }

    /// Drops every cached decision. In-flight lookups are unaffected.
    pub fn clear(&self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.entries.clear();
        }
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().map_or_else(
            |_| CacheStats::default(),
            |state| CacheStats {
                entries: state.entries.len(),
                in_flight: state.in_flight.len(),
            },
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
