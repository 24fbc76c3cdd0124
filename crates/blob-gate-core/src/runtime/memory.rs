// crates/blob-gate-core/src/runtime/memory.rs
// ============================================================================
// Module: Blob Gate In-Memory Backends
// Description: Process-local permission backend and grant provider.
// Purpose: Serve static deployments, local development, and tests.
// Dependencies: async-trait, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! In-memory implementations of the backend seams. Both count their calls so
//! callers can observe how often the runtime reaches for remote state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::RwLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::action::Action;
use crate::core::grant::GrantCapability;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ResourceRef;
use crate::core::permission::PermissionRecord;
use crate::interfaces::BackendError;
use crate::interfaces::GrantProvider;
use crate::interfaces::PermissionBackend;
use crate::interfaces::ProviderError;

// ============================================================================
// SECTION: Permission Backend
// ============================================================================

/// Permission backend over a fixed, replaceable record list.
#[derive(Debug, Default)]
pub struct StaticPermissionBackend {
    /// Current records.
    records: RwLock<Vec<PermissionRecord>>,
    /// Number of `fetch_records` calls served.
    calls: AtomicUsize,
}

impl StaticPermissionBackend {
    /// Builds a backend holding `records`.
    #[must_use]
    pub fn new(records: Vec<PermissionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replaces every record.
    pub fn replace(&self, records: Vec<PermissionRecord>) {
        if let Ok(mut guard) = self.records.write() {
            *guard = records;
        }
    }

    /// Returns the number of backend reads served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for StaticPermissionBackend {
    async fn fetch_records(
        &self,
        principal_id: &PrincipalId,
        _resource: &ResourceRef,
    ) -> Result<Vec<PermissionRecord>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = self
            .records
            .read()
            .map_err(|_| BackendError::Unavailable("record lock poisoned".to_string()))?;
        Ok(records.iter().filter(|record| &record.principal_id == principal_id).cloned().collect())
    }
}

// ============================================================================
// SECTION: Grant Provider
// ============================================================================

/// Default URL base for in-memory capabilities.
pub const IN_MEMORY_GRANT_BASE_URL: &str = "memory://blob-gate";

/// Grant provider over a process-local object set.
///
/// Capabilities are opaque `memory://` URLs; nothing is transferred.
#[derive(Debug)]
pub struct InMemoryGrantProvider {
    /// Existing objects.
    objects: RwLock<BTreeSet<ResourceRef>>,
    /// URL base for minted capabilities.
    base_url: String,
    /// Number of `exists` calls served.
    exists_calls: AtomicUsize,
    /// Number of `sign` calls served.
    sign_calls: AtomicUsize,
}

impl Default for InMemoryGrantProvider {
    fn default() -> Self {
        Self::new(IN_MEMORY_GRANT_BASE_URL)
    }
}

impl InMemoryGrantProvider {
    /// Builds an empty provider minting URLs under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeSet::new()),
            base_url: base_url.into(),
            exists_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// Builds a provider that already holds `objects`.
    #[must_use]
    pub fn with_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = ResourceRef>,
    {
        let provider = Self::default();
        if let Ok(mut guard) = provider.objects.write() {
            guard.extend(objects);
        }
        provider
    }

    /// Records that `resource` exists.
    pub fn put_object(&self, resource: ResourceRef) {
        if let Ok(mut guard) = self.objects.write() {
            guard.insert(resource);
        }
    }

    /// Forgets `resource`.
    pub fn remove_object(&self, resource: &ResourceRef) {
        if let Ok(mut guard) = self.objects.write() {
            guard.remove(resource);
        }
    }

    /// Returns the number of `exists` calls served.
    #[must_use]
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of `sign` calls served.
    #[must_use]
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Returns the total number of provider calls served.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.exists_calls() + self.sign_calls()
    }
}

#[async_trait]
impl GrantProvider for InMemoryGrantProvider {
    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ProviderError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self
            .objects
            .read()
            .map_err(|_| ProviderError::Unavailable("object lock poisoned".to_string()))?;
        Ok(objects.contains(resource))
    }

    async fn sign(
        &self,
        resource: &ResourceRef,
        action: Action,
        ttl: Duration,
    ) -> Result<GrantCapability, ProviderError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(GrantCapability {
            action,
            method: action.http_method().to_string(),
            url: format!(
                "{}/{}?action={}&expires_in={}",
                self.base_url.trim_end_matches('/'),
                resource.as_str(),
                action.as_str(),
                ttl.as_secs()
            ),
        })
    }
}
