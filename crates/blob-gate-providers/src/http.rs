// crates/blob-gate-providers/src/http.rs
// ============================================================================
// Module: Document Database Permission Backend
// Description: Permission records fetched from a document database over HTTP.
// Purpose: Serve the permission store from the authoritative record source.
// Dependencies: blob-gate-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`HttpPermissionBackend`] reads permission records with one `GET` per
//! lookup:
//!
//! ```text
//! GET {base_url}/v1/collections/{collection}/permissions?principal_id=..&resource=..
//! ```
//!
//! The response body is `{"records": [...]}`. A `404` means no records exist
//! for the principal. Every other failure maps to
//! [`BackendError::Unavailable`] so the store fails closed. Response bodies are
//! read under a hard size limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use blob_gate_config::HttpBackendConfig;
use blob_gate_core::BackendError;
use blob_gate_core::PermissionBackend;
use blob_gate_core::PermissionRecord;
use blob_gate_core::PrincipalId;
use blob_gate_core::ResourceRef;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use url::Url;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Response body of the permissions query.
#[derive(Debug, Deserialize)]
struct PermissionsResponse {
    /// Matching records.
    #[serde(default)]
    records: Vec<PermissionRecord>,
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Document-database permission backend.
///
/// # Invariants
/// - The endpoint URL has no query string; each lookup appends its own.
/// - Response bodies larger than `max_response_bytes` are rejected.
pub struct HttpPermissionBackend {
    /// Query endpoint without parameters.
    endpoint: Url,
    /// Headers sent with every request.
    headers: HeaderMap,
    /// HTTP client configured with timeouts.
    client: Client,
    /// Response size limit.
    max_response_bytes: usize,
}

impl HttpPermissionBackend {
    /// Builds a backend from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Invalid`] when the URL or token is unusable and
    /// [`BackendError::Unavailable`] when the HTTP client cannot be built.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;
        let base = config.base_url.trim().trim_end_matches('/');
        let endpoint =
            Url::parse(&format!("{base}/v1/collections/{}/permissions", config.collection.trim()))
                .map_err(|err| BackendError::Invalid(format!("invalid base_url: {err}")))?;
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| BackendError::Invalid("invalid auth token".to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("application/json"));
        Ok(Self {
            endpoint,
            headers,
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Returns the query endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the lookup URL for one key.
    fn lookup_url(&self, principal_id: &PrincipalId, resource: &ResourceRef) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("principal_id", principal_id.as_str())
            .append_pair("resource", resource.as_str());
        url
    }
}

#[async_trait]
impl PermissionBackend for HttpPermissionBackend {
    async fn fetch_records(
        &self,
        principal_id: &PrincipalId,
        resource: &ResourceRef,
    ) -> Result<Vec<PermissionRecord>, BackendError> {
        let response = self
            .client
            .get(self.lookup_url(principal_id, resource))
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let body = read_body_limited(response, self.max_response_bytes).await?;
                let parsed: PermissionsResponse = serde_json::from_slice(&body)
                    .map_err(|err| BackendError::Invalid(err.to_string()))?;
                Ok(parsed.records)
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status => Err(BackendError::Unavailable(format!(
                "document database error: status {status}"
            ))),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body while enforcing a byte limit.
async fn read_body_limited(
    mut response: Response,
    max_bytes: usize,
) -> Result<Vec<u8>, BackendError> {
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(BackendError::Invalid("response exceeds size limit".to_string()));
    }
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| BackendError::Unavailable(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err(BackendError::Invalid("response exceeds size limit".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
