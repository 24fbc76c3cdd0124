// crates/blob-gate-providers/tests/bootstrap.rs
// ============================================================================
// Module: Gateway Bootstrap Tests
// Description: Config-driven gateway construction.
// Purpose: Validate that a config file yields a working, audited gateway.
// ============================================================================

//! ## Overview
//! Builds gateways from `blob-gate.toml` text with the static backend and
//! in-memory provider, then drives access requests through them.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blob_gate_config::BlobGateConfig;
use blob_gate_config::PermissionBackendConfig;
use blob_gate_core::AccessRequest;
use blob_gate_core::Action;
use blob_gate_core::ActionSet;
use blob_gate_core::ManualClock;
use blob_gate_core::RejectionReason;
use blob_gate_core::Timestamp;
use blob_gate_core::TokenClaims;
use blob_gate_core::TokenSigner;
use blob_gate_providers::ProviderBuildError;
use blob_gate_providers::build_gateway_with_clock;
use blob_gate_providers::build_permission_backend;
use ed25519_dalek::SigningKey;
use tempfile::TempDir;

const NOW_SECS: i64 = 1_800_000_000;
const ISSUER: &str = "https://id.test";

fn signer() -> TokenSigner {
    TokenSigner::new(SigningKey::from_bytes(&[7; 32]), None)
}

fn config_text(audit: &str) -> String {
    let public_key = STANDARD.encode(signer().verification_key().key.to_bytes());
    format!(
        r#"[verifier]
trusted_issuers = ["{ISSUER}"]

[[verifier.keys]]
public_key = "{public_key}"

[permissions.backend]
type = "static"

[[permissions.backend.records]]
principal_id = "alice"
resource_pattern = "docs/*"
actions = ["read"]
updated_at = 0

[storage.provider]
type = "memory"
base_url = "memory://test"
objects = ["docs/a.pdf"]

{audit}
"#
    )
}

fn write_config(dir: &TempDir, audit: &str) -> BlobGateConfig {
    let path = dir.path().join("blob-gate.toml");
    std::fs::write(&path, config_text(audit)).unwrap();
    BlobGateConfig::load(&path).unwrap()
}

fn token(subject: &str) -> String {
    signer().sign(&TokenClaims::new(subject, ISSUER, NOW_SECS + 600)).unwrap()
}

#[tokio::test]
async fn static_config_grants_and_audits_to_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[audit]\nsink = \"file\"\npath = \"audit/access.jsonl\"");
    std::fs::create_dir(dir.path().join("audit")).unwrap();
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_seconds(NOW_SECS)));
    let gateway = build_gateway_with_clock(&config, clock).await.unwrap();

    let granted = gateway
        .request_access(AccessRequest::new(token("alice"), "docs/a.pdf", ActionSet::ALL))
        .await;
    let grant = granted.grant().expect("grant");
    assert_eq!(grant.actions, ActionSet::only(Action::Read));
    assert!(grant.capabilities[0].url.starts_with("memory://test/docs/a.pdf"));

    let denied = gateway
        .request_access(AccessRequest::new(token("bob"), "docs/a.pdf", ActionSet::only(Action::Read)))
        .await;
    assert!(matches!(denied.rejection().expect("rejection").reason, RejectionReason::Denied(_)));

    let log = std::fs::read_to_string(dir.path().join("audit/access.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["outcome"], "granted");
    assert_eq!(first["principal_id"], "alice");
}

#[tokio::test]
async fn unopenable_audit_file_fails_startup() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[audit]\nsink = \"file\"\npath = \"missing-dir/access.jsonl\"");
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_seconds(NOW_SECS)));
    let result = build_gateway_with_clock(&config, clock).await;
    assert!(matches!(result, Err(ProviderBuildError::Audit(_))));
}

#[test]
fn http_backend_builds_from_config() {
    let static_section = "[permissions.backend]\ntype = \"static\"\n\n[[permissions.backend.records]]\n\
                          principal_id = \"alice\"\nresource_pattern = \"docs/*\"\nactions = [\"read\"]\n\
                          updated_at = 0\n";
    let text = config_text("").replace(
        static_section,
        "[permissions.backend]\ntype = \"http\"\nbase_url = \"https://db.example.com\"\n",
    );
    let config = BlobGateConfig::from_toml_str(&text).unwrap();
    assert!(matches!(config.permissions.backend, PermissionBackendConfig::Http(_)));
    assert!(build_permission_backend(&config.permissions.backend).is_ok());
}
