// crates/blob-gate-core/src/core/principal.rs
// ============================================================================
// Module: Blob Gate Principal
// Description: Verified caller identity derived from a bearer token.
// Purpose: Carry verified claims through one gateway request.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Principal`] only exists after a token passes signature verification.
//! It is immutable and lives for the duration of one request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::identifiers::PrincipalId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Verified identity extracted from a bearer token.
///
/// # Invariants
/// - Constructed only by the token verifier (or tests) from verified claims.
/// - Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Token subject.
    subject: PrincipalId,
    /// Token issuer.
    issuer: String,
    /// Scopes granted by the token.
    scopes: BTreeSet<String>,
    /// Token expiry.
    expires_at: Timestamp,
    /// Audiences named by the token.
    audiences: Vec<String>,
    /// SHA-256 fingerprint of the raw token (audit only).
    token_fingerprint: String,
}

impl Principal {
    /// Builds a principal from verified claim values.
    #[must_use]
    pub fn new(
        subject: PrincipalId,
        issuer: impl Into<String>,
        scopes: BTreeSet<String>,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            subject,
            issuer: issuer.into(),
            scopes,
            expires_at,
            audiences: Vec::new(),
            token_fingerprint: String::new(),
        }
    }

    /// Returns a copy carrying the token audiences.
    #[must_use]
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }

    /// Returns a copy carrying the token fingerprint.
    #[must_use]
    pub fn with_token_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.token_fingerprint = fingerprint.into();
        self
    }

    /// Returns the subject identifier.
    #[must_use]
    pub const fn subject(&self) -> &PrincipalId {
        &self.subject
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the granted scopes.
    #[must_use]
    pub const fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// Returns true when the token carries `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Returns the token expiry.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Returns the token audiences.
    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    /// Returns the token fingerprint, empty when unknown.
    #[must_use]
    pub fn token_fingerprint(&self) -> &str {
        &self.token_fingerprint
    }
}
