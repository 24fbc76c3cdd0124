// crates/blob-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Blob Gate Interfaces
// Description: Backend-agnostic seams for permission state and blob storage.
// Purpose: Define the contract surfaces used by the Blob Gate runtime.
// Dependencies: async-trait, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The runtime talks to the document database and to blob storage only
//! through these traits. Implementations must fail closed: a transport
//! problem is reported as an error, never as an empty answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::action::Action;
use crate::core::grant::GrantCapability;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ResourceRef;
use crate::core::permission::PermissionRecord;

// ============================================================================
// SECTION: Permission Backend
// ============================================================================

/// Permission backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Backend could not be reached or returned an unexpected status.
    #[error("permission backend unavailable: {0}")]
    Unavailable(String),
    /// Backend returned a payload that could not be decoded.
    #[error("permission backend returned invalid data: {0}")]
    Invalid(String),
}

/// Read-only source of permission records.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Fetches the records that may apply to `principal_id` on `resource`.
    ///
    /// Returning extra records is allowed; the caller filters them.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the records cannot be fetched.
    async fn fetch_records(
        &self,
        principal_id: &PrincipalId,
        resource: &ResourceRef,
    ) -> Result<Vec<PermissionRecord>, BackendError>;
}

// ============================================================================
// SECTION: Grant Provider
// ============================================================================

/// Grant provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Storage service could not be reached or rejected the call.
    #[error("storage provider unavailable: {0}")]
    Unavailable(String),
    /// Object or bucket does not exist.
    #[error("storage object not found: {0}")]
    NotFound(String),
    /// Provider could not build a capability for the request.
    #[error("storage provider rejected request: {0}")]
    Rejected(String),
}

/// Blob storage service able to mint time-limited capabilities.
#[async_trait]
pub trait GrantProvider: Send + Sync {
    /// Returns true when the object exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when existence cannot be determined.
    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ProviderError>;

    /// Mints a capability for one action on `resource`, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the capability cannot be minted.
    async fn sign(
        &self,
        resource: &ResourceRef,
        action: Action,
        ttl: Duration,
    ) -> Result<GrantCapability, ProviderError>;
}
