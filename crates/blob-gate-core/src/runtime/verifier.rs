// crates/blob-gate-core/src/runtime/verifier.rs
// ============================================================================
// Module: Blob Gate Token Verifier
// Description: EdDSA bearer token verification against a swappable key set.
// Purpose: Turn an untrusted bearer token into a verified Principal.
// Dependencies: base64, ed25519-dalek, serde_json, sha2, crate::core
// ============================================================================

//! ## Overview
//! Tokens use the JWS compact form with EdDSA signatures:
//! `base64url(header).base64url(claims).base64url(signature)`, unpadded.
//! Verification applies a fixed check order so each failure maps to exactly
//! one reason: malformed, signature, expiry, issuer, audience. Claims are
//! decoded structurally before the signature check but no claim value is
//! trusted until the signature has verified.
//!
//! Key material lives in a [`KeySetHandle`]. Rotation swaps the whole set in
//! one step; every verification works against one consistent snapshot.
//! Security posture: tokens are untrusted input; fail closed on any doubt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::RwLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer as _;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;
use thiserror::Error;

use crate::core::errors::AuthError;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::PrincipalId;
use crate::core::principal::Principal;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Only accepted JWS algorithm.
pub const TOKEN_ALGORITHM: &str = "EdDSA";
/// Default maximum encoded token size in bytes.
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 8 * 1024;
/// Maximum accepted `Authorization` header size in bytes.
pub const MAX_AUTH_HEADER_BYTES: usize = 16 * 1024;

// ============================================================================
// SECTION: Key Material
// ============================================================================

/// Key material failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Key bytes could not be decoded.
    #[error("invalid key encoding: {0}")]
    Encoding(String),
    /// Decoded bytes are not a valid ed25519 key.
    #[error("invalid ed25519 key: {0}")]
    Invalid(String),
    /// Token could not be encoded for signing.
    #[error("token encoding failed: {0}")]
    Signing(String),
}

/// Verification key with an optional key identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    /// Key identifier matched against the token `kid` header.
    pub key_id: Option<KeyId>,
    /// Ed25519 public key.
    pub key: VerifyingKey,
}

impl VerificationKey {
    /// Builds a verification key from a base64 (standard alphabet) public key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the text is not a base64 32-byte ed25519 key.
    pub fn from_base64(key_id: Option<KeyId>, encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|err| KeyError::Encoding(err.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Invalid("public key must be 32 bytes".to_string()))?;
        let key =
            VerifyingKey::from_bytes(&bytes).map_err(|err| KeyError::Invalid(err.to_string()))?;
        Ok(Self {
            key_id,
            key,
        })
    }
}

/// Immutable set of verification keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationKeys {
    /// Keys in configuration order.
    keys: Vec<VerificationKey>,
}

impl VerificationKeys {
    /// Builds a key set.
    #[must_use]
    pub const fn new(keys: Vec<VerificationKey>) -> Self {
        Self {
            keys,
        }
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns true when some key selected by `key_id` verifies `signature`.
    ///
    /// A token naming a `kid` is only checked against keys with that id; a
    /// token without one is checked against every key.
    fn verify(&self, key_id: Option<&str>, message: &[u8], signature: &Signature) -> bool {
        self.keys
            .iter()
            .filter(|candidate| match key_id {
                Some(kid) => candidate.key_id.as_ref().is_some_and(|id| id.as_str() == kid),
                None => true,
            })
            .any(|candidate| candidate.key.verify_strict(message, signature).is_ok())
    }
}

/// Shared, swappable handle to the current key set.
///
/// Clones share the same underlying key set.
#[derive(Debug, Clone, Default)]
pub struct KeySetHandle {
    /// Current snapshot; the lock is held only to clone or swap the `Arc`.
    current: Arc<RwLock<Arc<VerificationKeys>>>,
}

impl KeySetHandle {
    /// Creates a handle holding `keys`.
    #[must_use]
    pub fn new(keys: VerificationKeys) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(keys))),
        }
    }

    /// Returns the current key set snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<VerificationKeys> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically replaces the key set. In-flight verifications keep the
    /// snapshot they already hold.
    pub fn replace(&self, keys: VerificationKeys) {
        let next = Arc::new(keys);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

// ============================================================================
// SECTION: Token Format
// ============================================================================

/// JWS protected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm.
    pub alg: String,
    /// Optional key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Optional token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Audience claim: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Returns the audiences as a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(audience) => vec![audience.clone()],
            Self::Many(audiences) => audiences.clone(),
        }
    }
}

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal identifier).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Expiry in unix seconds.
    pub exp: i64,
    /// Optional issued-at in unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Optional audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Optional space-delimited scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Optional scope list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl TokenClaims {
    /// Builds claims with the required fields.
    #[must_use]
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>, expires_at: i64) -> Self {
        Self {
            sub: subject.into(),
            iss: issuer.into(),
            exp: expires_at,
            iat: None,
            aud: None,
            scope: None,
            scopes: None,
        }
    }

    /// Collects scopes from both `scope` and `scopes`.
    fn scope_set(&self) -> BTreeSet<String> {
        let mut scopes = BTreeSet::new();
        if let Some(scope) = &self.scope {
            scopes.extend(scope.split_whitespace().map(str::to_string));
        }
        if let Some(list) = &self.scopes {
            scopes.extend(list.iter().filter(|scope| !scope.is_empty()).cloned());
        }
        scopes
    }
}

/// Structurally decoded token, not yet verified.
struct DecodedToken<'a> {
    /// Protected header.
    header: TokenHeader,
    /// Unverified claims.
    claims: TokenClaims,
    /// Detached signature.
    signature: Signature,
    /// `header.claims` bytes the signature covers.
    signing_input: &'a [u8],
}

/// Decodes the compact serialization without trusting anything in it.
fn decode_token(token: &str, max_bytes: usize) -> Result<DecodedToken<'_>, AuthError> {
    if token.is_empty() {
        return Err(AuthError::MalformedToken("empty token".to_string()));
    }
    if token.len() > max_bytes {
        return Err(AuthError::MalformedToken("token exceeds size limit".to_string()));
    }
    let mut segments = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(AuthError::MalformedToken("expected three segments".to_string()));
    };
    let header: TokenHeader = decode_segment(header_b64, "header")?;
    let claims: TokenClaims = decode_segment(claims_b64, "claims")?;
    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature_b64.as_bytes())
        .map_err(|_| AuthError::MalformedToken("signature is not base64url".to_string()))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|_| AuthError::MalformedToken("signature must be 64 bytes".to_string()))?;
    let signing_input = &token.as_bytes()[.. header_b64.len() + 1 + claims_b64.len()];
    Ok(DecodedToken {
        header,
        claims,
        signature,
        signing_input,
    })
}

/// Decodes one base64url JSON segment.
fn decode_segment<T>(segment: &str, label: &str) -> Result<T, AuthError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| AuthError::MalformedToken(format!("{label} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::MalformedToken(format!("{label} is not valid json")))
}

/// Returns the lowercase hex sha256 fingerprint of a raw token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] when the header is missing, too
/// large, or not a bearer credential.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::MalformedToken("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::MalformedToken("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedToken("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifier policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Accepted issuers.
    pub trusted_issuers: BTreeSet<String>,
    /// Required audience, if any.
    pub audience: Option<String>,
    /// Maximum encoded token size in bytes.
    pub max_token_bytes: usize,
}

impl VerifierSettings {
    /// Builds settings trusting `issuers` with no audience requirement.
    #[must_use]
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_issuers: issuers.into_iter().map(Into::into).collect(),
            audience: None,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    /// Returns settings that also require `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Bearer token verifier.
///
/// # Invariants
/// - A [`Principal`] is returned only after the signature has verified.
/// - Checks run in a fixed order: malformed, signature, expiry, issuer,
///   audience.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    /// Swappable verification keys.
    keys: KeySetHandle,
    /// Verifier policy.
    settings: VerifierSettings,
}

impl TokenVerifier {
    /// Builds a verifier over `keys`.
    #[must_use]
    pub const fn new(keys: KeySetHandle, settings: VerifierSettings) -> Self {
        Self {
            keys,
            settings,
        }
    }

    /// Returns the key set handle for rotation.
    #[must_use]
    pub const fn key_set(&self) -> &KeySetHandle {
        &self.keys
    }

    /// Returns the verifier policy.
    #[must_use]
    pub const fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verifies `token` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AuthError`]:
    /// [`AuthError::MalformedToken`], [`AuthError::InvalidSignature`],
    /// [`AuthError::Expired`], [`AuthError::UntrustedIssuer`], or
    /// [`AuthError::InvalidAudience`].
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<Principal, AuthError> {
        let decoded = decode_token(token, self.settings.max_token_bytes)?;

        if decoded.header.alg != TOKEN_ALGORITHM {
            return Err(AuthError::InvalidSignature);
        }
        let keys = self.keys.snapshot();
        if !keys.verify(decoded.header.kid.as_deref(), decoded.signing_input, &decoded.signature)
        {
            return Err(AuthError::InvalidSignature);
        }

        let claims = decoded.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken("subject is empty".to_string()));
        }
        let expires_at = Timestamp::from_unix_seconds(claims.exp);
        if expires_at <= now {
            return Err(AuthError::Expired);
        }
        if !self.settings.trusted_issuers.contains(&claims.iss) {
            return Err(AuthError::UntrustedIssuer(claims.iss));
        }
        let audiences = claims.aud.as_ref().map(Audience::to_vec).unwrap_or_default();
        if let Some(required) = &self.settings.audience {
            if !audiences.iter().any(|audience| audience == required) {
                return Err(AuthError::InvalidAudience);
            }
        }

        let scopes = claims.scope_set();
        Ok(Principal::new(PrincipalId::new(claims.sub), claims.iss, scopes, expires_at)
            .with_audiences(audiences)
            .with_token_fingerprint(token_fingerprint(token)))
    }
}

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Mints EdDSA tokens. Used by operator tooling and tests.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    /// Signing key.
    key: SigningKey,
    /// Key identifier written into the header.
    key_id: Option<KeyId>,
}

impl TokenSigner {
    /// Builds a signer.
    #[must_use]
    pub const fn new(key: SigningKey, key_id: Option<KeyId>) -> Self {
        Self {
            key,
            key_id,
        }
    }

    /// Builds a signer from a base64 (standard alphabet) 32-byte secret key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the text is not a base64 32-byte key.
    pub fn from_base64(encoded: &str, key_id: Option<KeyId>) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|err| KeyError::Encoding(err.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Invalid("secret key must be 32 bytes".to_string()))?;
        Ok(Self::new(SigningKey::from_bytes(&bytes), key_id))
    }

    /// Returns the matching verification key.
    #[must_use]
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            key_id: self.key_id.clone(),
            key: self.key.verifying_key(),
        }
    }

    /// Signs `claims` into a compact token.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Signing`] when the header or claims cannot be
    /// serialized.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, KeyError> {
        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            kid: self.key_id.as_ref().map(|id| id.as_str().to_string()),
            typ: Some("JWT".to_string()),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|err| KeyError::Signing(err.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|err| KeyError::Signing(err.to_string()))?;
        let mut token = URL_SAFE_NO_PAD.encode(header_json);
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(claims_json));
        let signature = self.key.sign(token.as_bytes());
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature.to_bytes()));
        Ok(token)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
