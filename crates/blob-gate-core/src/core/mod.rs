// crates/blob-gate-core/src/core/mod.rs
// ============================================================================
// Module: Blob Gate Core Types
// Description: Data model shared by every gateway component.
// Purpose: Provide stable, serializable types for principals, decisions, and grants.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types describe verified principals, permission records, authorization
//! decisions, and storage grants. They carry no I/O and are shared by the
//! runtime components and every adapter crate.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod action;
pub mod decision;
pub mod errors;
pub mod grant;
pub mod identifiers;
pub mod permission;
pub mod principal;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action::Action;
pub use action::ActionSet;
pub use decision::AuthDecision;
pub use decision::DenyReason;
pub use errors::AuthError;
pub use errors::ReasonCategory;
pub use errors::RejectionReason;
pub use grant::GrantCapability;
pub use grant::StorageGrant;
pub use identifiers::KeyId;
pub use identifiers::MAX_RESOURCE_LENGTH;
pub use identifiers::MAX_RESOURCE_SEGMENT_LENGTH;
pub use identifiers::PrincipalId;
pub use identifiers::RequestId;
pub use identifiers::ResourceError;
pub use identifiers::ResourceRef;
pub use permission::PermissionRecord;
pub use permission::ResourcePattern;
pub use permission::Resolution;
pub use permission::resolve_records;
pub use principal::Principal;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use time::Timestamp;
