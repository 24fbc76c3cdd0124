// crates/blob-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `blob-gate.toml`. The key is a placeholder and must be
//! replaced with a real ed25519 public key (see `blob-gate keygen`).

/// Placeholder public key (RFC 8032 test vector 1).
pub const EXAMPLE_PUBLIC_KEY: &str = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=";

/// Returns a canonical example `blob-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    format!(
        r#"[verifier]
trusted_issuers = ["https://id.example.com"]
# audience = "blob-gate"
max_token_bytes = 8192

[[verifier.keys]]
key_id = "primary"
public_key = "{EXAMPLE_PUBLIC_KEY}"
# public_key_file = "keys/primary.pub"

[permissions]
cache_ttl_ms = 60000
lookup_timeout_ms = 2000
max_entries = 10000

[permissions.backend]
type = "http"
base_url = "https://documents.internal.example.com"
collection = "permissions"
# auth_token = "..."
connect_timeout_ms = 500
request_timeout_ms = 2000

[storage]
default_ttl_secs = 900
max_ttl_secs = 3600
grant_timeout_ms = 5000

[storage.uploads]
policy = "documents"

[storage.provider]
type = "s3"
bucket = "blob-gate-objects"
region = "us-east-1"
prefix = "tenants/main"
# endpoint = "https://s3.example.com"
# force_path_style = false

[gateway]
request_timeout_ms = 10000

[audit]
sink = "stderr"
"#
    )
}
