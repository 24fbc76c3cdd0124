// crates/blob-gate-core/src/lib.rs
// ============================================================================
// Module: Blob Gate Core Library
// Description: Public API surface for the Blob Gate core.
// Purpose: Expose core types, backend interfaces, and runtime components.
// Dependencies: crate::{audit, core, interfaces, runtime, telemetry}
// ============================================================================

//! ## Overview
//! Blob Gate authorizes and brokers client access to blob storage. A caller
//! presents a signed bearer token and a resource reference; the gateway
//! verifies the token, resolves an authorization decision from permission
//! records held in a document database, and returns a time-limited storage
//! grant or a typed rejection. Remote systems are reached only through the
//! [`PermissionBackend`] and [`GrantProvider`] interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use audit::AccessAuditRecord;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use interfaces::BackendError;
pub use interfaces::GrantProvider;
pub use interfaces::PermissionBackend;
pub use interfaces::ProviderError;
pub use runtime::AccessOutcome;
pub use runtime::AccessRequest;
pub use runtime::BrokerSettings;
pub use runtime::CacheStats;
pub use runtime::Gateway;
pub use runtime::GatewaySettings;
pub use runtime::GatewayStage;
pub use runtime::InMemoryGrantProvider;
pub use runtime::KeySetHandle;
pub use runtime::PermissionStore;
pub use runtime::PermissionStoreSettings;
pub use runtime::Rejection;
pub use runtime::StaticPermissionBackend;
pub use runtime::StorageBroker;
pub use runtime::TokenClaims;
pub use runtime::TokenSigner;
pub use runtime::TokenVerifier;
pub use runtime::VerificationKey;
pub use runtime::VerificationKeys;
pub use runtime::VerifierSettings;
pub use telemetry::CacheEvent;
pub use telemetry::GatewayMetrics;
pub use telemetry::NoopMetrics;
