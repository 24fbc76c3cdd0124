// crates/blob-gate-core/src/runtime/broker.rs
// ============================================================================
// Module: Blob Gate Storage Broker
// Description: Issues time-limited storage grants through a grant provider.
// Purpose: Mint presigned capabilities only for already-authorized actions.
// Dependencies: tokio, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The broker turns an authorized action set into a [`StorageGrant`]. It
//! never moves object bytes and never mutates the target object; it only
//! asks the provider whether the object exists and to sign capabilities.
//!
//! - Requested TTLs are clamped to `[1s, max_ttl]`.
//! - Existence is checked only when the set contains `read` or `delete`, so
//!   write-only grants can target objects that do not exist yet.
//! - The whole call is bounded by the grant timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::core::action::Action;
use crate::core::action::ActionSet;
use crate::core::errors::AuthError;
use crate::core::grant::StorageGrant;
use crate::core::identifiers::ResourceRef;
use crate::core::time::Clock;
use crate::interfaces::GrantProvider;
use crate::interfaces::ProviderError;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Shortest grant lifetime.
pub const MIN_GRANT_TTL: Duration = Duration::from_secs(1);
/// Default grant lifetime when the caller does not ask for one.
pub const DEFAULT_GRANT_TTL: Duration = Duration::from_secs(15 * 60);
/// Default upper bound on grant lifetime.
pub const DEFAULT_MAX_GRANT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default bound on one grant call.
pub const DEFAULT_GRANT_TIMEOUT: Duration = Duration::from_secs(5);
/// Document extensions accepted for uploads when an upload policy is enabled.
pub const DOCUMENT_UPLOAD_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf"];

/// Broker tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Lifetime used when the caller does not request one.
    pub default_ttl: Duration,
    /// Longest lifetime a grant may have.
    pub max_ttl: Duration,
    /// Upper bound on one grant call, existence check included.
    pub grant_timeout: Duration,
    /// Lowercase extensions accepted for `write` grants. `None` accepts any.
    pub upload_extensions: Option<BTreeSet<String>>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_GRANT_TTL,
            max_ttl: DEFAULT_MAX_GRANT_TTL,
            grant_timeout: DEFAULT_GRANT_TIMEOUT,
            upload_extensions: None,
        }
    }
}

impl BrokerSettings {
    /// Returns the effective lifetime for a requested TTL.
    #[must_use]
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        let ceiling = self.max_ttl.max(MIN_GRANT_TTL);
        requested.unwrap_or(self.default_ttl).clamp(MIN_GRANT_TTL, ceiling)
    }

    /// Checks the upload policy for `resource`.
    fn check_upload(&self, resource: &ResourceRef) -> Result<(), AuthError> {
        let Some(allowed) = &self.upload_extensions else {
            return Ok(());
        };
        match resource.extension() {
            Some(extension) if allowed.contains(&extension) => Ok(()),
            Some(extension) => Err(AuthError::InvalidRequest(format!(
                "uploads of .{extension} files are not accepted"
            ))),
            None => Err(AuthError::InvalidRequest("uploads require a file extension".to_string())),
        }
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Issues storage grants through a [`GrantProvider`].
#[derive(Clone)]
pub struct StorageBroker {
    /// Storage service adapter.
    provider: Arc<dyn GrantProvider>,
    /// Time source for issue/expiry timestamps.
    clock: Arc<dyn Clock>,
    /// Tuning.
    settings: BrokerSettings,
}

impl StorageBroker {
    /// Builds a broker over `provider`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn GrantProvider>,
        clock: Arc<dyn Clock>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            provider,
            clock,
            settings,
        }
    }

    /// Returns the broker settings.
    #[must_use]
    pub const fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Issues a grant for `actions` on `resource`.
    ///
    /// Callers must only pass actions already covered by an Allow decision.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] for an empty action set or an upload
    ///   rejected by the extension policy.
    /// - [`AuthError::ResourceNotFound`] when a read or delete targets a
    ///   missing object.
    /// - [`AuthError::ProviderUnavailable`] on provider failure or timeout.
    pub async fn grant(
        &self,
        resource: &ResourceRef,
        actions: ActionSet,
        ttl: Option<Duration>,
    ) -> Result<StorageGrant, AuthError> {
        if actions.is_empty() {
            return Err(AuthError::InvalidRequest("no actions to grant".to_string()));
        }
        if actions.contains(Action::Write) {
            self.settings.check_upload(resource)?;
        }
        let ttl = self.settings.effective_ttl(ttl);
        tokio::time::timeout(self.settings.grant_timeout, self.issue(resource, actions, ttl))
            .await
            .unwrap_or_else(|_| {
                Err(AuthError::ProviderUnavailable("grant issuance timed out".to_string()))
            })
    }

    /// Checks existence when needed, then signs one capability per action.
    async fn issue(
        &self,
        resource: &ResourceRef,
        actions: ActionSet,
        ttl: Duration,
    ) -> Result<StorageGrant, AuthError> {
        if actions.contains(Action::Read) || actions.contains(Action::Delete) {
            let exists = self.provider.exists(resource).await.map_err(map_provider_error)?;
            if !exists {
                return Err(AuthError::ResourceNotFound(resource.to_string()));
            }
        }
        let issued_at = self.clock.now();
        let mut capabilities = Vec::with_capacity(actions.len());
        for action in actions.iter() {
            let capability =
                self.provider.sign(resource, action, ttl).await.map_err(map_provider_error)?;
            capabilities.push(capability);
        }
        Ok(StorageGrant {
            resource: resource.clone(),
            actions,
            capabilities,
            issued_at,
            expires_at: issued_at.saturating_add(ttl),
        })
    }
}

/// Maps provider failures onto the gateway error taxonomy.
fn map_provider_error(err: ProviderError) -> AuthError {
    match err {
        ProviderError::NotFound(resource) => AuthError::ResourceNotFound(resource),
        ProviderError::Unavailable(detail) | ProviderError::Rejected(detail) => {
            AuthError::ProviderUnavailable(detail)
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
