// crates/blob-gate-providers/src/s3.rs
// ============================================================================
// Module: S3 Grant Provider
// Description: Presigned S3 capabilities for blob access.
// Purpose: Mint time-limited GET/PUT/DELETE URLs without proxying bytes.
// Dependencies: aws-config, aws-sdk-s3, blob-gate-core
// ============================================================================

//! ## Overview
//! [`S3GrantProvider`] checks existence with `HeadObject` and mints SigV4
//! presigned URLs for each granted action. Resource references map to object
//! keys under an optional prefix. Works with any S3-compatible endpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresignedRequest;
use aws_sdk_s3::presigning::PresigningConfig;
use blob_gate_config::S3ProviderConfig;
use blob_gate_core::Action;
use blob_gate_core::GrantCapability;
use blob_gate_core::GrantProvider;
use blob_gate_core::ProviderError;
use blob_gate_core::ResourceRef;

// ============================================================================
// SECTION: Provider
// ============================================================================

/// S3-backed grant provider.
///
/// # Invariants
/// - `prefix` is empty or ends with `/`.
#[derive(Debug, Clone)]
pub struct S3GrantProvider {
    /// S3 client.
    client: Client,
    /// Bucket holding the blobs.
    bucket: String,
    /// Key prefix applied to every resource.
    prefix: String,
}

impl S3GrantProvider {
    /// Builds a provider from validated configuration, loading credentials
    /// and region from the environment where the config leaves them unset.
    pub async fn from_config(config: &S3ProviderConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.trim().to_string()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.trim());
        }
        let shared_config = loader.load().await;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Self::from_client(
            Client::from_conf(s3_builder.build()),
            config.bucket.trim(),
            config.normalized_prefix(),
        )
    }

    /// Builds a provider over an existing client.
    #[must_use]
    pub fn from_client(client: Client, bucket: impl Into<String>, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|raw| {
                let trimmed = raw.trim_matches('/');
                if trimmed.is_empty() { String::new() } else { format!("{trimmed}/") }
            })
            .unwrap_or_default();
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Returns the object key for `resource`.
    #[must_use]
    pub fn object_key(&self, resource: &ResourceRef) -> String {
        format!("{}{}", self.prefix, resource.as_str())
    }

    /// Presigns one action.
    async fn presign(
        &self,
        key: String,
        action: Action,
        presigning: PresigningConfig,
    ) -> Result<PresignedRequest, ProviderError> {
        let bucket = self.bucket.as_str();
        match action {
            Action::Read => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|err| ProviderError::Unavailable(DisplayErrorContext(&err).to_string())),
            Action::Write => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|err| ProviderError::Unavailable(DisplayErrorContext(&err).to_string())),
            Action::Delete => self
                .client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|err| ProviderError::Unavailable(DisplayErrorContext(&err).to_string())),
        }
    }
}

#[async_trait]
impl GrantProvider for S3GrantProvider {
    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ProviderError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(resource))
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(HeadObjectError::is_not_found) => {
                Ok(false)
            }
            Err(err) => Err(ProviderError::Unavailable(DisplayErrorContext(&err).to_string())),
        }
    }

    async fn sign(
        &self,
        resource: &ResourceRef,
        action: Action,
        ttl: Duration,
    ) -> Result<GrantCapability, ProviderError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|err| ProviderError::Rejected(err.to_string()))?;
        let request = self.presign(self.object_key(resource), action, presigning).await?;
        Ok(GrantCapability {
            action,
            method: request.method().to_string(),
            url: request.uri().to_string(),
        })
    }
}
