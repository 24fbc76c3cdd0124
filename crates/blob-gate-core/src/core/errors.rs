// crates/blob-gate-core/src/core/errors.rs
// ============================================================================
// Module: Blob Gate Error Taxonomy
// Description: Typed failures and rejection reasons for gateway requests.
// Purpose: Keep authentication, authorization, and infrastructure failures apart.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`AuthError`] is the failure type of every component step. The gateway
//! folds it, together with authorization denials, into a [`RejectionReason`]
//! that callers translate into their own transport. Reasons are classified
//! so monitoring can alert on infrastructure failures without treating
//! ordinary denials as incidents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::decision::DenyReason;
use crate::core::identifiers::ResourceError;

// ============================================================================
// SECTION: Auth Errors
// ============================================================================

/// Component-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// No configured key verified the token signature.
    #[error("invalid token signature")]
    InvalidSignature,
    /// Token expiry has passed.
    #[error("token expired")]
    Expired,
    /// Token issuer is not in the allow-list.
    #[error("untrusted issuer: {0}")]
    UntrustedIssuer(String),
    /// Token audience does not include this gateway.
    #[error("token audience not accepted")]
    InvalidAudience,
    /// Permission store could not be reached or answered badly.
    #[error("permission store unavailable: {0}")]
    StoreUnavailable(String),
    /// Storage provider could not be reached or answered badly.
    #[error("storage provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Target object or collection does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// Request deadline elapsed.
    #[error("request deadline exceeded")]
    Timeout,
    /// Resource reference failed validation.
    #[error("invalid resource: {0}")]
    InvalidResource(String),
    /// Request parameters are unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ResourceError> for AuthError {
    fn from(err: ResourceError) -> Self {
        Self::InvalidResource(err.to_string())
    }
}

// ============================================================================
// SECTION: Rejection Reasons
// ============================================================================

/// Classification used for monitoring and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    /// Credential problems. Terminal.
    Authentication,
    /// Normal authorization refusal. Terminal, not an incident.
    Authorization,
    /// Remote dependency or deadline failure. Caller may retry with backoff.
    Infrastructure,
    /// Malformed request or missing resource. Terminal.
    Request,
}

impl ReasonCategory {
    /// Returns a stable label for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Infrastructure => "infrastructure",
            Self::Request => "request",
        }
    }
}

/// Typed reason returned to the caller instead of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Token could not be decoded.
    MalformedToken(String),
    /// Token signature did not verify.
    InvalidSignature,
    /// Token expired.
    Expired,
    /// Token issuer is not trusted.
    UntrustedIssuer(String),
    /// Token audience not accepted.
    InvalidAudience,
    /// Authorization refused.
    Denied(DenyReason),
    /// Permission store unavailable.
    StoreUnavailable(String),
    /// Storage provider unavailable.
    ProviderUnavailable(String),
    /// Resource does not exist.
    ResourceNotFound(String),
    /// Request deadline exceeded.
    Timeout,
    /// Resource reference invalid.
    InvalidResource(String),
    /// Request parameters invalid.
    InvalidRequest(String),
}

impl RejectionReason {
    /// Returns a stable snake_case label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::UntrustedIssuer(_) => "untrusted_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::Denied(_) => "denied",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::ResourceNotFound(_) => "resource_not_found",
            Self::Timeout => "timeout",
            Self::InvalidResource(_) => "invalid_resource",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Returns the monitoring category.
    #[must_use]
    pub const fn category(&self) -> ReasonCategory {
        match self {
            Self::MalformedToken(_)
            | Self::InvalidSignature
            | Self::Expired
            | Self::UntrustedIssuer(_)
            | Self::InvalidAudience => ReasonCategory::Authentication,
            Self::Denied(_) => ReasonCategory::Authorization,
            Self::StoreUnavailable(_) | Self::ProviderUnavailable(_) | Self::Timeout => {
                ReasonCategory::Infrastructure
            }
            Self::ResourceNotFound(_) | Self::InvalidResource(_) | Self::InvalidRequest(_) => {
                ReasonCategory::Request
            }
        }
    }

    /// Returns true when a caller-driven retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ReasonCategory::Infrastructure)
    }
}

impl From<AuthError> for RejectionReason {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedToken(detail) => Self::MalformedToken(detail),
            AuthError::InvalidSignature => Self::InvalidSignature,
            AuthError::Expired => Self::Expired,
            AuthError::UntrustedIssuer(issuer) => Self::UntrustedIssuer(issuer),
            AuthError::InvalidAudience => Self::InvalidAudience,
            AuthError::StoreUnavailable(detail) => Self::StoreUnavailable(detail),
            AuthError::ProviderUnavailable(detail) => Self::ProviderUnavailable(detail),
            AuthError::ResourceNotFound(resource) => Self::ResourceNotFound(resource),
            AuthError::Timeout => Self::Timeout,
            AuthError::InvalidResource(detail) => Self::InvalidResource(detail),
            AuthError::InvalidRequest(detail) => Self::InvalidRequest(detail),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied(reason) => write!(f, "denied: {reason}"),
            Self::MalformedToken(detail)
            | Self::UntrustedIssuer(detail)
            | Self::StoreUnavailable(detail)
            | Self::ProviderUnavailable(detail)
            | Self::ResourceNotFound(detail)
            | Self::InvalidResource(detail)
            | Self::InvalidRequest(detail) => write!(f, "{}: {detail}", self.label()),
            Self::InvalidSignature | Self::Expired | Self::InvalidAudience | Self::Timeout => {
                f.write_str(self.label())
            }
        }
    }
}
