// crates/blob-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Blob Gate Runtime
// Description: Token verification, permission caching, grant issuance, gateway.
// Purpose: Execute access requests against remote permission and storage state.
// Dependencies: crate::{core, interfaces, audit, telemetry}, tokio
// ============================================================================

//! ## Overview
//! Runtime components, leaf first: [`TokenVerifier`], [`PermissionStore`],
//! [`StorageBroker`], and the [`Gateway`] that composes them. In-memory
//! backends live alongside for static deployments and tests.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod broker;
pub mod gateway;
pub mod memory;
pub mod permissions;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use broker::BrokerSettings;
pub use broker::DOCUMENT_UPLOAD_EXTENSIONS;
pub use broker::StorageBroker;
pub use gateway::AccessOutcome;
pub use gateway::AccessRequest;
pub use gateway::Gateway;
pub use gateway::GatewaySettings;
pub use gateway::GatewayStage;
pub use gateway::Rejection;
pub use memory::InMemoryGrantProvider;
pub use memory::StaticPermissionBackend;
pub use permissions::CacheStats;
pub use permissions::PermissionStore;
pub use permissions::PermissionStoreSettings;
pub use verifier::Audience;
pub use verifier::KeyError;
pub use verifier::KeySetHandle;
pub use verifier::TokenClaims;
pub use verifier::TokenSigner;
pub use verifier::TokenVerifier;
pub use verifier::VerificationKey;
pub use verifier::VerificationKeys;
pub use verifier::VerifierSettings;
pub use verifier::parse_bearer_token;
pub use verifier::token_fingerprint;
