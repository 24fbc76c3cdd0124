// crates/blob-gate-core/src/core/grant.rs
// ============================================================================
// Module: Blob Gate Storage Grants
// Description: Time-limited capabilities minted by the storage provider.
// Purpose: Describe what a caller may do with a resource and until when.
// Dependencies: serde
// ============================================================================

//! Storage grants. A grant holds one presigned capability per granted action
//! and expires independently of the decision that produced it.

use serde::Serialize;

use crate::core::action::Action;
use crate::core::action::ActionSet;
use crate::core::identifiers::ResourceRef;
use crate::core::time::Timestamp;

/// One presigned capability inside a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantCapability {
    /// Action the capability permits.
    pub action: Action,
    /// HTTP method the caller must use.
    pub method: String,
    /// Capability URL (or opaque token for non-URL providers).
    pub url: String,
}

/// Time-limited capability scoped to one resource and one action set.
///
/// # Invariants
/// - `capabilities` holds exactly one entry per action in `actions`.
/// - `expires_at` is at most the broker's maximum TTL after `issued_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageGrant {
    /// Resource the grant applies to.
    pub resource: ResourceRef,
    /// Actions the grant permits.
    pub actions: ActionSet,
    /// Presigned capabilities, in canonical action order.
    pub capabilities: Vec<GrantCapability>,
    /// Issue time.
    pub issued_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
}

impl StorageGrant {
    /// Returns the capability for `action`, if granted.
    #[must_use]
    pub fn capability(&self, action: Action) -> Option<&GrantCapability> {
        self.capabilities.iter().find(|capability| capability.action == action)
    }
}
