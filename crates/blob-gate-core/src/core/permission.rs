// crates/blob-gate-core/src/core/permission.rs
// ============================================================================
// Module: Blob Gate Permission Records
// Description: Permission records, resource patterns, and decision resolution.
// Purpose: Turn document-database records into a single authorization decision.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Permission records are owned by an out-of-band administrative path and are
//! read-only here. When several records match a resource, the most specific
//! pattern wins and ties go to the most recently updated record. Records that
//! have expired never contribute an allow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::action::ActionSet;
use crate::core::decision::AuthDecision;
use crate::core::decision::DenyReason;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ResourceError;
use crate::core::identifiers::ResourceRef;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Resource Pattern
// ============================================================================

/// Record-side matcher for resource references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourcePattern {
    /// Matches every resource (`*`).
    Any,
    /// Matches resources under a prefix (`docs/*`). Stored with the trailing `/`.
    Prefix(String),
    /// Matches one resource exactly.
    Exact(ResourceRef),
}

impl ResourcePattern {
    /// Parses a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the non-wildcard portion is not a valid
    /// resource reference.
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        if raw == "*" {
            return Ok(Self::Any);
        }
        if let Some(prefix) = raw.strip_suffix("/*") {
            let base = ResourceRef::parse(prefix)?;
            return Ok(Self::Prefix(format!("{}/", base.as_str())));
        }
        Ok(Self::Exact(ResourceRef::parse(raw)?))
    }

    /// Returns true when the pattern covers `resource`.
    #[must_use]
    pub fn matches(&self, resource: &ResourceRef) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => resource.as_str().starts_with(prefix.as_str()),
            Self::Exact(exact) => exact == resource,
        }
    }

    /// Returns an ordering key; larger keys are more specific.
    #[must_use]
    pub fn specificity(&self) -> (u8, usize) {
        match self {
            Self::Any => (0, 0),
            Self::Prefix(prefix) => (1, prefix.len()),
            Self::Exact(exact) => (2, exact.as_str().len()),
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
            Self::Exact(exact) => exact.fmt(f),
        }
    }
}

impl Serialize for ResourcePattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourcePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Permission Record
// ============================================================================

/// Permission record stored in the document database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Principal the record applies to.
    pub principal_id: PrincipalId,
    /// Resources the record applies to.
    pub resource_pattern: ResourcePattern,
    /// Actions the record allows.
    pub actions: ActionSet,
    /// Optional record expiry.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    /// Last administrative update.
    pub updated_at: Timestamp,
}

impl PermissionRecord {
    /// Returns true when the record has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Decision derived from a set of candidate records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Authorization decision.
    pub decision: AuthDecision,
    /// Expiry of the record that produced an allow, if it has one.
    pub valid_until: Option<Timestamp>,
}

/// Resolves candidate records into a decision for `principal` on `resource`.
///
/// Records for other principals or non-matching patterns are ignored, so a
/// backend may return a superset of the relevant records.
#[must_use]
pub fn resolve_records(
    records: &[PermissionRecord],
    principal: &PrincipalId,
    resource: &ResourceRef,
    now: Timestamp,
) -> Resolution {
    let mut saw_expired = false;
    let mut best: Option<&PermissionRecord> = None;
    for record in records {
        if &record.principal_id != principal || !record.resource_pattern.matches(resource) {
            continue;
        }
        if record.is_expired(now) {
            saw_expired = true;
            continue;
        }
        best = match best {
            None => Some(record),
            Some(current) => {
                let candidate_key =
                    (record.resource_pattern.specificity(), record.updated_at);
                let current_key = (current.resource_pattern.specificity(), current.updated_at);
                if candidate_key > current_key { Some(record) } else { Some(current) }
            }
        };
    }
    match best {
        Some(record) if record.actions.is_empty() => Resolution {
            decision: AuthDecision::Deny(DenyReason::ActionNotPermitted),
            valid_until: record.expires_at,
        },
        Some(record) => Resolution {
            decision: AuthDecision::Allow(record.actions),
            valid_until: record.expires_at,
        },
        None if saw_expired => Resolution {
            decision: AuthDecision::Deny(DenyReason::RecordExpired),
            valid_until: None,
        },
        None => Resolution {
            decision: AuthDecision::Deny(DenyReason::NoMatchingRecord),
            valid_until: None,
        },
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
