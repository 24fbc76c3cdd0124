// crates/blob-gate-providers/src/bootstrap.rs
// ============================================================================
// Module: Gateway Bootstrap
// Description: Builds a gateway from validated configuration.
// Purpose: Wire verifier, permission store, broker, and audit sink together.
// Dependencies: blob-gate-config, blob-gate-core
// ============================================================================

//! ## Overview
//! [`build_gateway`] turns a [`BlobGateConfig`] into a ready [`Gateway`]:
//! keys are loaded, the configured permission backend and grant provider are
//! constructed, and the audit sink is opened. Any failure aborts startup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use blob_gate_config::AuditSinkKind;
use blob_gate_config::BlobGateConfig;
use blob_gate_config::GrantProviderConfig;
use blob_gate_config::PermissionBackendConfig;
use blob_gate_core::AuditSink;
use blob_gate_core::Clock;
use blob_gate_core::FileAuditSink;
use blob_gate_core::Gateway;
use blob_gate_core::GrantProvider;
use blob_gate_core::InMemoryGrantProvider;
use blob_gate_core::KeySetHandle;
use blob_gate_core::NoopAuditSink;
use blob_gate_core::PermissionBackend;
use blob_gate_core::PermissionStore;
use blob_gate_core::StaticPermissionBackend;
use blob_gate_core::StderrAuditSink;
use blob_gate_core::StorageBroker;
use blob_gate_core::SystemClock;
use blob_gate_core::TokenVerifier;
use thiserror::Error;

use crate::http::HttpPermissionBackend;
use crate::s3::S3GrantProvider;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Configuration could not be turned into runtime settings.
    #[error("config error: {0}")]
    Config(String),
    /// Permission backend could not be built.
    #[error("permission backend error: {0}")]
    Backend(String),
    /// Grant provider could not be built.
    #[error("grant provider error: {0}")]
    Provider(String),
    /// Audit sink could not be opened.
    #[error("audit sink error: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the gateway described by `config`, using the system clock.
///
/// # Errors
///
/// Returns [`ProviderBuildError`] when any component cannot be built.
pub async fn build_gateway(config: &BlobGateConfig) -> Result<Gateway, ProviderBuildError> {
    build_gateway_with_clock(config, Arc::new(SystemClock)).await
}

/// Builds the gateway described by `config` over `clock`.
///
/// # Errors
///
/// Returns [`ProviderBuildError`] when any component cannot be built.
pub async fn build_gateway_with_clock(
    config: &BlobGateConfig,
    clock: Arc<dyn Clock>,
) -> Result<Gateway, ProviderBuildError> {
    let keys =
        config.verification_keys().map_err(|err| ProviderBuildError::Config(err.to_string()))?;
    let verifier = TokenVerifier::new(KeySetHandle::new(keys), config.verifier.settings());
    let permissions = PermissionStore::new(
        build_permission_backend(&config.permissions.backend)?,
        Arc::clone(&clock),
        config.permissions.settings(),
    );
    let broker = StorageBroker::new(
        build_grant_provider(&config.storage.provider).await?,
        Arc::clone(&clock),
        config.storage.settings(),
    );
    let audit = build_audit_sink(config)?;
    Ok(Gateway::new(verifier, permissions, broker, clock, config.gateway.settings())
        .with_audit(audit))
}

/// Builds the configured permission backend.
///
/// # Errors
///
/// Returns [`ProviderBuildError::Backend`] when the backend cannot be built.
pub fn build_permission_backend(
    config: &PermissionBackendConfig,
) -> Result<Arc<dyn PermissionBackend>, ProviderBuildError> {
    match config {
        PermissionBackendConfig::Http(http) => HttpPermissionBackend::new(http)
            .map(|backend| Arc::new(backend) as Arc<dyn PermissionBackend>)
            .map_err(|err| ProviderBuildError::Backend(err.to_string())),
        PermissionBackendConfig::Static(records) => {
            Ok(Arc::new(StaticPermissionBackend::new(records.records.clone())))
        }
    }
}

/// Builds the configured grant provider.
///
/// # Errors
///
/// Returns [`ProviderBuildError::Provider`] when the provider cannot be built.
pub async fn build_grant_provider(
    config: &GrantProviderConfig,
) -> Result<Arc<dyn GrantProvider>, ProviderBuildError> {
    match config {
        GrantProviderConfig::S3(s3) => Ok(Arc::new(S3GrantProvider::from_config(s3).await)),
        GrantProviderConfig::Memory(memory) => {
            let provider = memory
                .base_url
                .as_deref()
                .map_or_else(InMemoryGrantProvider::default, InMemoryGrantProvider::new);
            let objects =
                memory.resources().map_err(|err| ProviderBuildError::Provider(err.to_string()))?;
            for object in objects {
                provider.put_object(object);
            }
            Ok(Arc::new(provider))
        }
    }
}

/// Opens the configured audit sink.
///
/// # Errors
///
/// Returns [`ProviderBuildError::Audit`] when the audit file cannot be opened.
pub fn build_audit_sink(config: &BlobGateConfig) -> Result<Arc<dyn AuditSink>, ProviderBuildError> {
    match (config.audit.sink, &config.audit.path) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::File, Some(path)) => open_file_sink(&config.resolve_path(path)),
        (AuditSinkKind::File, None) => {
            Err(ProviderBuildError::Audit("audit.path is required for file sink".to_string()))
        }
    }
}

/// Opens an append-only JSON-lines audit file.
fn open_file_sink(path: &Path) -> Result<Arc<dyn AuditSink>, ProviderBuildError> {
    FileAuditSink::new(path)
        .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
        .map_err(|err| ProviderBuildError::Audit(format!("{}: {err}", path.display())))
}
