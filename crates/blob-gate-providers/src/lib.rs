// crates/blob-gate-providers/src/lib.rs
// ============================================================================
// Module: Blob Gate Providers Library
// Description: Remote adapters for permission records and blob storage.
// Purpose: Implement the core backend seams and bootstrap a gateway.
// Dependencies: blob-gate-config, blob-gate-core, reqwest, aws-sdk-s3
// ============================================================================

//! ## Overview
//! Concrete implementations of the core seams: [`HttpPermissionBackend`]
//! reads permission records from a document database and [`S3GrantProvider`]
//! presigns S3 requests. [`build_gateway`] wires them from configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bootstrap;
pub mod http;
pub mod s3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bootstrap::ProviderBuildError;
pub use bootstrap::build_audit_sink;
pub use bootstrap::build_gateway;
pub use bootstrap::build_gateway_with_clock;
pub use bootstrap::build_grant_provider;
pub use bootstrap::build_permission_backend;
pub use http::HttpPermissionBackend;
pub use s3::S3GrantProvider;
