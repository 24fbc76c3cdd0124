// crates/blob-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Blob Gate Identifiers
// Description: Opaque identifiers for principals, keys, requests, and resources.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. [`ResourceRef`] is the one
//! identifier validated at construction: it doubles as the authorization key
//! and the storage object key, so traversal and ambiguous separators are
//! rejected before any lookup happens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total length of a resource reference in bytes.
pub const MAX_RESOURCE_LENGTH: usize = 1024;
/// Maximum length of a single resource path segment in bytes.
pub const MAX_RESOURCE_SEGMENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Principal identifier (token subject).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a new principal identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Verification key identifier (JWS `kid`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Creates a new key identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Caller-supplied request identifier used for audit correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new request identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Resource Reference
// ============================================================================

/// Resource reference validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Resource reference is empty.
    #[error("resource reference is empty")]
    Empty,
    /// Resource reference exceeds the length limit.
    #[error("resource reference exceeds {MAX_RESOURCE_LENGTH} bytes")]
    TooLong,
    /// Resource reference contains an invalid segment.
    #[error("resource reference has invalid segment: {0}")]
    InvalidSegment(String),
}

/// Validated reference naming a storage object or collection.
///
/// # Invariants
/// - Relative, `/`-separated path with no empty, `.`, or `..` segments.
/// - No backslashes or control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    /// Parses and validates a resource reference.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the reference is empty, too long, or
    /// contains an unsafe segment.
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        if raw.is_empty() {
            return Err(ResourceError::Empty);
        }
        if raw.len() > MAX_RESOURCE_LENGTH {
            return Err(ResourceError::TooLong);
        }
        for segment in raw.split('/') {
            validate_segment(segment)?;
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the lowercase extension of the final segment, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for ResourceRef {
    type Error = ResourceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl<'de> Deserialize<'de> for ResourceRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validates a single resource path segment.
fn validate_segment(segment: &str) -> Result<(), ResourceError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ResourceError::InvalidSegment(segment.to_string()));
    }
    if segment.len() > MAX_RESOURCE_SEGMENT_LENGTH {
        return Err(ResourceError::InvalidSegment("segment exceeds length limit".to_string()));
    }
    if segment.chars().any(|ch| ch == '\\' || ch.is_control()) {
        return Err(ResourceError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}
