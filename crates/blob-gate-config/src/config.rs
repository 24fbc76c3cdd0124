// crates/blob-gate-config/src/config.rs
// ============================================================================
// Module: Blob Gate Configuration
// Description: Configuration loading and validation for Blob Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: blob-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from an explicit TOML path with strict size and
//! path limits. Missing or invalid configuration fails closed. Validated
//! sections convert into the settings types consumed by the core runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use blob_gate_core::BrokerSettings;
use blob_gate_core::GatewaySettings;
use blob_gate_core::KeyId;
use blob_gate_core::PermissionRecord;
use blob_gate_core::PermissionStoreSettings;
use blob_gate_core::ResourceRef;
use blob_gate_core::VerificationKey;
use blob_gate_core::VerificationKeys;
use blob_gate_core::VerifierSettings;
use blob_gate_core::runtime::DOCUMENT_UPLOAD_EXTENSIONS;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum size of a public key file in bytes.
pub const MAX_KEY_FILE_SIZE: usize = 4 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of trusted issuers.
pub(crate) const MAX_TRUSTED_ISSUERS: usize = 32;
/// Maximum number of verification keys.
pub(crate) const MAX_VERIFICATION_KEYS: usize = 16;
/// Maximum number of static permission records.
pub(crate) const MAX_STATIC_RECORDS: usize = 10_000;
/// Maximum number of seeded in-memory objects.
pub(crate) const MAX_MEMORY_OBJECTS: usize = 10_000;
/// Maximum number of upload extensions.
pub(crate) const MAX_UPLOAD_EXTENSIONS: usize = 64;
/// Minimum accepted token size limit.
pub(crate) const MIN_TOKEN_BYTES: usize = 256;
/// Maximum accepted token size limit.
pub(crate) const MAX_TOKEN_BYTES: usize = 64 * 1024;
/// Default token size limit.
pub(crate) const DEFAULT_TOKEN_BYTES: usize = 8 * 1024;
/// Maximum permission cache TTL in milliseconds.
pub(crate) const MAX_CACHE_TTL_MS: u64 = 60 * 60 * 1000;
/// Minimum permission lookup timeout in milliseconds.
pub(crate) const MIN_LOOKUP_TIMEOUT_MS: u64 = 10;
/// Maximum permission lookup timeout in milliseconds.
pub(crate) const MAX_LOOKUP_TIMEOUT_MS: u64 = 60_000;
/// Maximum permission cache entries.
pub(crate) const MAX_CACHE_ENTRIES: usize = 1_000_000;
/// Longest presigned URL lifetime accepted by S3 (7 days).
pub(crate) const MAX_GRANT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Minimum grant timeout in milliseconds.
pub(crate) const MIN_GRANT_TIMEOUT_MS: u64 = 100;
/// Maximum grant timeout in milliseconds.
pub(crate) const MAX_GRANT_TIMEOUT_MS: u64 = 60_000;
/// Minimum gateway request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum gateway request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Minimum HTTP connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum HTTP connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum HTTP request timeout in milliseconds.
pub(crate) const MIN_HTTP_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum HTTP request timeout in milliseconds.
pub(crate) const MAX_HTTP_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default maximum document-database response size in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum configurable document-database response size in bytes.
pub(crate) const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum length of a collection name.
pub(crate) const MAX_COLLECTION_LENGTH: usize = 128;
/// Default document-database collection.
pub const DEFAULT_COLLECTION: &str = "permissions";

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root `blob-gate.toml` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobGateConfig {
    /// Token verification settings.
    pub verifier: VerifierConfig,
    /// Permission store and document-database backend.
    pub permissions: PermissionsConfig,
    /// Grant issuance and blob-storage provider.
    pub storage: StorageConfig,
    /// Gateway deadlines.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Directory the config was loaded from; relative paths resolve here.
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

impl BlobGateConfig {
    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.verifier.validate()?;
        self.permissions.validate()?;
        self.storage.validate()?;
        self.gateway.validate()?;
        self.audit.validate()
    }

    /// Resolves `path` against the config directory when it is relative.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path.trim());
        match &self.source_dir {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate,
        }
    }

    /// Loads the configured verification keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a key file cannot be read or a key is invalid.
    pub fn verification_keys(&self) -> Result<VerificationKeys, ConfigError> {
        let mut keys = Vec::with_capacity(self.verifier.keys.len());
        for (index, entry) in self.verifier.keys.iter().enumerate() {
            let encoded = match (&entry.public_key, &entry.public_key_file) {
                (Some(inline), None) => inline.trim().to_string(),
                (None, Some(file)) => read_key_file(&self.resolve_path(file))?,
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "verifier.keys[{index}] must set exactly one of public_key or public_key_file"
                    )));
                }
            };
            let key_id = entry.key_id.as_deref().map(KeyId::new);
            let key = VerificationKey::from_base64(key_id, &encoded).map_err(|err| {
                ConfigError::Invalid(format!("verifier.keys[{index}]: {err}"))
            })?;
            keys.push(key);
        }
        Ok(VerificationKeys::new(keys))
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    /// Issuers whose tokens are accepted.
    pub trusted_issuers: Vec<String>,
    /// Audience tokens must carry, when set.
    #[serde(default)]
    pub audience: Option<String>,
    /// Maximum token size in bytes.
    #[serde(default = "default_token_bytes")]
    pub max_token_bytes: usize,
    /// Verification keys.
    pub keys: Vec<KeyConfig>,
}

impl VerifierConfig {
    /// Validates verifier configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.trusted_issuers.is_empty() {
            return Err(ConfigError::Invalid(
                "verifier.trusted_issuers must not be empty".to_string(),
            ));
        }
        if self.trusted_issuers.len() > MAX_TRUSTED_ISSUERS {
            return Err(ConfigError::Invalid("verifier.trusted_issuers exceeds limit".to_string()));
        }
        if self.trusted_issuers.iter().any(|issuer| issuer.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "verifier.trusted_issuers entries must be non-empty".to_string(),
            ));
        }
        if self.audience.as_deref().is_some_and(|audience| audience.trim().is_empty()) {
            return Err(ConfigError::Invalid("verifier.audience must be non-empty".to_string()));
        }
        validate_range(
            "verifier.max_token_bytes",
            self.max_token_bytes,
            MIN_TOKEN_BYTES,
            MAX_TOKEN_BYTES,
        )?;
        if self.keys.is_empty() {
            return Err(ConfigError::Invalid("verifier.keys must not be empty".to_string()));
        }
        if self.keys.len() > MAX_VERIFICATION_KEYS {
            return Err(ConfigError::Invalid("verifier.keys exceeds limit".to_string()));
        }
        let mut seen = BTreeSet::new();
        for (index, key) in self.keys.iter().enumerate() {
            key.validate(index)?;
            if let Some(key_id) = &key.key_id
                && !seen.insert(key_id.as_str())
            {
                return Err(ConfigError::Invalid(format!(
                    "verifier.keys[{index}].key_id duplicates {key_id}"
                )));
            }
        }
        Ok(())
    }

    /// Returns verifier settings for the core runtime.
    #[must_use]
    pub fn settings(&self) -> VerifierSettings {
        let mut settings = VerifierSettings::new(self.trusted_issuers.iter().map(|issuer| issuer.trim()));
        settings.max_token_bytes = self.max_token_bytes;
        match &self.audience {
            Some(audience) => settings.with_audience(audience.trim()),
            None => settings,
        }
    }
}

/// One verification key, inline or on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Optional key identifier matched against the token `kid`.
    #[serde(default)]
    pub key_id: Option<String>,
    /// Base64 ed25519 public key.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Path to a file holding a base64 ed25519 public key.
    #[serde(default)]
    pub public_key_file: Option<String>,
}

impl KeyConfig {
    /// Validates one key entry.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.public_key.is_some() == self.public_key_file.is_some() {
            return Err(ConfigError::Invalid(format!(
                "verifier.keys[{index}] must set exactly one of public_key or public_key_file"
            )));
        }
        if self.key_id.as_deref().is_some_and(|key_id| key_id.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("verifier.keys[{index}].key_id must be non-empty")));
        }
        if let Some(file) = &self.public_key_file {
            validate_path_string(&format!("verifier.keys[{index}].public_key_file"), file)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Permissions
// ============================================================================

/// Permission store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Cache lifetime for resolved decisions.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Upper bound on one backend read.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Maximum cached decisions; `0` disables caching.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Permission record source.
    pub backend: PermissionBackendConfig,
}

impl PermissionsConfig {
    /// Validates permission configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("permissions.cache_ttl_ms", self.cache_ttl_ms, 0, MAX_CACHE_TTL_MS)?;
        validate_range(
            "permissions.lookup_timeout_ms",
            self.lookup_timeout_ms,
            MIN_LOOKUP_TIMEOUT_MS,
            MAX_LOOKUP_TIMEOUT_MS,
        )?;
        validate_range("permissions.max_entries", self.max_entries, 0, MAX_CACHE_ENTRIES)?;
        self.backend.validate()
    }

    /// Returns permission store settings for the core runtime.
    #[must_use]
    pub const fn settings(&self) -> PermissionStoreSettings {
        PermissionStoreSettings {
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms),
            max_entries: self.max_entries,
        }
    }
}

/// Permission record source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionBackendConfig {
    /// Document database reached over HTTP.
    Http(HttpBackendConfig),
    /// Records held in the config file.
    Static(StaticBackendConfig),
}

impl PermissionBackendConfig {
    /// Validates backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Http(config) => config.validate(),
            Self::Static(config) => config.validate(),
        }
    }
}

/// Document-database HTTP backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpBackendConfig {
    /// Base URL of the document database API.
    pub base_url: String,
    /// Collection holding permission records.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Bearer token sent with each request.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Connect timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout.
    #[serde(default = "default_http_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum response body size.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow non-TLS URLs (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl HttpBackendConfig {
    /// Validates HTTP backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("permissions.backend.base_url", &self.base_url, self.allow_http)?;
        let collection = self.collection.trim();
        if collection.is_empty() || collection.len() > MAX_COLLECTION_LENGTH {
            return Err(ConfigError::Invalid(
                "permissions.backend.collection must be 1-128 characters".to_string(),
            ));
        }
        if !collection.bytes().all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-'))
        {
            return Err(ConfigError::Invalid(
                "permissions.backend.collection must be alphanumeric, '_' or '-'".to_string(),
            ));
        }
        if self.auth_token.as_deref().is_some_and(|token| token.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "permissions.backend.auth_token must be non-empty".to_string(),
            ));
        }
        validate_range(
            "permissions.backend.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_CONNECT_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_range(
            "permissions.backend.request_timeout_ms",
            self.request_timeout_ms,
            MIN_HTTP_REQUEST_TIMEOUT_MS,
            MAX_HTTP_REQUEST_TIMEOUT_MS,
        )?;
        validate_range(
            "permissions.backend.max_response_bytes",
            self.max_response_bytes,
            1,
            MAX_RESPONSE_BYTES,
        )
    }
}

/// Static permission records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticBackendConfig {
    /// Records served to the permission store.
    #[serde(default)]
    pub records: Vec<PermissionRecord>,
}

impl StaticBackendConfig {
    /// Validates static backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.records.len() > MAX_STATIC_RECORDS {
            return Err(ConfigError::Invalid("permissions.backend.records exceeds limit".to_string()));
        }
        if self.records.iter().any(|record| record.principal_id.as_str().trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "permissions.backend.records principal_id must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Grant issuance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Grant lifetime when the caller does not request one.
    #[serde(default = "default_grant_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Longest grant lifetime.
    #[serde(default = "default_max_grant_ttl_secs")]
    pub max_ttl_secs: u64,
    /// Upper bound on one grant call.
    #[serde(default = "default_grant_timeout_ms")]
    pub grant_timeout_ms: u64,
    /// Upload extension policy.
    #[serde(default)]
    pub uploads: UploadPolicyConfig,
    /// Blob-storage provider.
    pub provider: GrantProviderConfig,
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("storage.max_ttl_secs", self.max_ttl_secs, 1, MAX_GRANT_TTL_SECS)?;
        validate_range("storage.default_ttl_secs", self.default_ttl_secs, 1, self.max_ttl_secs)?;
        validate_range(
            "storage.grant_timeout_ms",
            self.grant_timeout_ms,
            MIN_GRANT_TIMEOUT_MS,
            MAX_GRANT_TIMEOUT_MS,
        )?;
        self.uploads.validate()?;
        self.provider.validate()
    }

    /// Returns broker settings for the core runtime.
    #[must_use]
    pub fn settings(&self) -> BrokerSettings {
        BrokerSettings {
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            max_ttl: Duration::from_secs(self.max_ttl_secs),
            grant_timeout: Duration::from_millis(self.grant_timeout_ms),
            upload_extensions: self.uploads.extensions(),
        }
    }
}

/// Upload extension policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPolicy {
    /// Any extension may be uploaded.
    #[default]
    Any,
    /// Only document formats may be uploaded.
    Documents,
    /// Only the listed extensions may be uploaded.
    Custom,
}

/// Upload policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadPolicyConfig {
    /// Policy selection.
    #[serde(default)]
    pub policy: UploadPolicy,
    /// Extensions for [`UploadPolicy::Custom`].
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl UploadPolicyConfig {
    /// Validates upload policy configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.policy {
            UploadPolicy::Custom => {
                if self.extensions.is_empty() {
                    return Err(ConfigError::Invalid(
                        "storage.uploads.extensions must not be empty for custom policy".to_string(),
                    ));
                }
                if self.extensions.len() > MAX_UPLOAD_EXTENSIONS {
                    return Err(ConfigError::Invalid(
                        "storage.uploads.extensions exceeds limit".to_string(),
                    ));
                }
                for extension in &self.extensions {
                    let trimmed = extension.trim().trim_start_matches('.');
                    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_alphanumeric())
                    {
                        return Err(ConfigError::Invalid(format!(
                            "storage.uploads.extensions entry '{extension}' is invalid"
                        )));
                    }
                }
                Ok(())
            }
            UploadPolicy::Any | UploadPolicy::Documents if !self.extensions.is_empty() => {
                Err(ConfigError::Invalid(
                    "storage.uploads.extensions requires policy = \"custom\"".to_string(),
                ))
            }
            UploadPolicy::Any | UploadPolicy::Documents => Ok(()),
        }
    }

    /// Returns the accepted lowercase extensions, `None` when any is accepted.
    #[must_use]
    pub fn extensions(&self) -> Option<BTreeSet<String>> {
        match self.policy {
            UploadPolicy::Any => None,
            UploadPolicy::Documents => {
                Some(DOCUMENT_UPLOAD_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect())
            }
            UploadPolicy::Custom => Some(
                self.extensions
                    .iter()
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .collect(),
            ),
        }
    }
}

/// Blob-storage provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrantProviderConfig {
    /// S3-compatible object storage.
    S3(S3ProviderConfig),
    /// In-memory object set for local runs.
    Memory(MemoryProviderConfig),
}

impl GrantProviderConfig {
    /// Validates provider configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::S3(config) => config.validate(),
            Self::Memory(config) => config.validate(),
        }
    }
}

/// S3-compatible provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct S3ProviderConfig {
    /// Bucket holding the blobs.
    pub bucket: String,
    /// Optional region (defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Force path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl S3ProviderConfig {
    /// Validates S3 configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.provider.bucket must be set".to_string()));
        }
        if self.region.as_deref().is_some_and(|region| region.trim().is_empty()) {
            return Err(ConfigError::Invalid("storage.provider.region must be non-empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            validate_url("storage.provider.endpoint", endpoint, self.allow_http)?;
        }
        if let Some(prefix) = &self.prefix {
            validate_object_prefix(prefix)?;
        }
        Ok(())
    }

    /// Returns the normalized key prefix, ending in `/`, if any.
    #[must_use]
    pub fn normalized_prefix(&self) -> Option<String> {
        self.prefix.as_deref().map(|prefix| {
            let trimmed = prefix.trim().trim_end_matches('/');
            format!("{trimmed}/")
        })
    }
}

/// In-memory provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryProviderConfig {
    /// Base URL embedded in issued grants.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Objects that exist at startup.
    #[serde(default)]
    pub objects: Vec<String>,
}

impl MemoryProviderConfig {
    /// Validates in-memory provider configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.objects.len() > MAX_MEMORY_OBJECTS {
            return Err(ConfigError::Invalid("storage.provider.objects exceeds limit".to_string()));
        }
        self.resources().map(|_| ())
    }

    /// Parses the seeded objects into resource references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an object name is not a valid resource.
    pub fn resources(&self) -> Result<Vec<ResourceRef>, ConfigError> {
        self.objects
            .iter()
            .map(|raw| {
                ResourceRef::parse(raw).map_err(|err| {
                    ConfigError::Invalid(format!("storage.provider.objects entry '{raw}': {err}"))
                })
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Gateway configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GatewayConfig {
    /// Deadline for one access request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Validates gateway configuration.
    fn validate(self) -> Result<(), ConfigError> {
        validate_range(
            "gateway.request_timeout_ms",
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )
    }

    /// Returns gateway settings for the core runtime.
    #[must_use]
    pub const fn settings(self) -> GatewaySettings {
        GatewaySettings {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit disabled.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for [`AuditSinkKind::File`].
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for file sink".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default token size limit.
const fn default_token_bytes() -> usize {
    DEFAULT_TOKEN_BYTES
}

/// Default cache TTL in milliseconds.
const fn default_cache_ttl_ms() -> u64 {
    60_000
}

/// Default lookup timeout in milliseconds.
const fn default_lookup_timeout_ms() -> u64 {
    2_000
}

/// Default cache capacity.
const fn default_max_entries() -> usize {
    10_000
}

/// Default collection name.
fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

/// Default HTTP connect timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    500
}

/// Default HTTP request timeout in milliseconds.
const fn default_http_request_timeout_ms() -> u64 {
    2_000
}

/// Default response size limit.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default grant TTL in seconds.
const fn default_grant_ttl_secs() -> u64 {
    15 * 60
}

/// Default maximum grant TTL in seconds.
const fn default_max_grant_ttl_secs() -> u64 {
    60 * 60
}

/// Default grant timeout in milliseconds.
const fn default_grant_timeout_ms() -> u64 {
    5_000
}

/// Default gateway request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks `value` lies within `[min, max]`.
fn validate_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Validates an HTTP(S) URL, rejecting plain HTTP unless allowed.
fn validate_url(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ConfigError::Invalid(format!("{field} must include http:// or https://")));
    }
    if trimmed.starts_with("http://") && !allow_http {
        return Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the object key prefix.
fn validate_object_prefix(value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("storage.provider.prefix must be non-empty".to_string()));
    }
    if trimmed.contains('\\') {
        return Err(ConfigError::Invalid(
            "storage.provider.prefix must not contain backslashes".to_string(),
        ));
    }
    if trimmed.starts_with('/') {
        return Err(ConfigError::Invalid("storage.provider.prefix must be relative".to_string()));
    }
    let normalized = trimmed.trim_end_matches('/');
    ResourceRef::parse(normalized).map_err(|err| {
        ConfigError::Invalid(format!("storage.provider.prefix is invalid: {err}"))
    })?;
    Ok(())
}

/// Reads a base64 public key from disk.
fn read_key_file(path: &Path) -> Result<String, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_KEY_FILE_SIZE {
        return Err(ConfigError::Invalid(format!("{} exceeds key size limit", path.display())));
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid(format!("{} must be utf-8", path.display())))?;
    Ok(text.trim().to_string())
}
