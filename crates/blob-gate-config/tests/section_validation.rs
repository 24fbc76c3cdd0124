//! Section validation tests for blob-gate-config.
// crates/blob-gate-config/tests/section_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Validate per-section bounds and settings conversion.
// Purpose: Ensure out-of-range values fail closed and valid values convert.
// =============================================================================

use std::time::Duration;

use blob_gate_config::AuditSinkKind;
use blob_gate_config::BlobGateConfig;
use blob_gate_config::GrantProviderConfig;
use blob_gate_config::PermissionBackendConfig;
use blob_gate_config::examples::EXAMPLE_PUBLIC_KEY;
use blob_gate_core::Action;
use blob_gate_core::ActionSet;

type TestResult = Result<(), String>;

const VERIFIER: &str = r#"[verifier]
trusted_issuers = ["https://id.test"]
"#;

fn base(sections: &str) -> String {
    format!(
        "{VERIFIER}[[verifier.keys]]\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\"\n\n{sections}"
    )
}

fn minimal(extra: &str) -> String {
    base(&format!(
        "[permissions.backend]\ntype = \"static\"\n\n[storage.provider]\ntype = \"memory\"\n\n{extra}"
    ))
}

fn expect_invalid(content: &str, needle: &str) -> TestResult {
    match BlobGateConfig::from_toml_str(content) {
        Err(error) if error.to_string().contains(needle) => Ok(()),
        Err(error) => Err(format!("error {error} did not contain {needle}")),
        Ok(_) => Err(format!("expected failure containing {needle}")),
    }
}

#[test]
fn minimal_config_uses_defaults() -> TestResult {
    let config = BlobGateConfig::from_toml_str(&minimal("")).map_err(|err| err.to_string())?;
    let store = config.permissions.settings();
    if store.cache_ttl != Duration::from_secs(60) || store.lookup_timeout != Duration::from_secs(2) {
        return Err("unexpected permission defaults".to_string());
    }
    let broker = config.storage.settings();
    if broker.default_ttl != Duration::from_secs(900) || broker.max_ttl != Duration::from_secs(3600) {
        return Err("unexpected grant ttl defaults".to_string());
    }
    if broker.upload_extensions.is_some() {
        return Err("default upload policy accepts any extension".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("default audit sink is stderr".to_string());
    }
    if config.verifier.settings().max_token_bytes != 8 * 1024 {
        return Err("default token limit mismatch".to_string());
    }
    Ok(())
}

#[test]
fn empty_issuers_rejected() -> TestResult {
    let content = format!(
        "[verifier]\ntrusted_issuers = []\n[[verifier.keys]]\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\"\n\
         [permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"memory\"\n"
    );
    expect_invalid(&content, "verifier.trusted_issuers must not be empty")
}

#[test]
fn missing_keys_rejected() -> TestResult {
    let content = format!(
        "{VERIFIER}keys = []\n[permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"memory\"\n"
    );
    expect_invalid(&content, "verifier.keys must not be empty")
}

#[test]
fn audience_carried_into_settings() -> TestResult {
    let content = format!(
        "[verifier]\ntrusted_issuers = [\"https://id.test\"]\naudience = \"blob-gate\"\n\
         [[verifier.keys]]\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\"\n\
         [permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"memory\"\n"
    );
    let config = BlobGateConfig::from_toml_str(&content).map_err(|err| err.to_string())?;
    let settings = config.verifier.settings();
    if settings.audience.as_deref() != Some("blob-gate") {
        return Err("audience not carried".to_string());
    }
    if !settings.trusted_issuers.contains("https://id.test") {
        return Err("issuer not carried".to_string());
    }
    Ok(())
}

#[test]
fn lookup_timeout_bounds_enforced() -> TestResult {
    let content = base(
        "[permissions]\nlookup_timeout_ms = 0\n[permissions.backend]\ntype = \"static\"\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&content, "permissions.lookup_timeout_ms must be between")
}

#[test]
fn zero_capacity_cache_is_allowed() -> TestResult {
    let content = base(
        "[permissions]\nmax_entries = 0\n[permissions.backend]\ntype = \"static\"\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    let config = BlobGateConfig::from_toml_str(&content).map_err(|err| err.to_string())?;
    if config.permissions.settings().max_entries != 0 {
        return Err("max_entries not carried".to_string());
    }
    Ok(())
}

#[test]
fn http_backend_requires_tls_unless_opted_in() -> TestResult {
    let plain = base(
        "[permissions.backend]\ntype = \"http\"\nbase_url = \"http://db.local\"\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&plain, "uses http:// without allow_http")?;

    let opted_in = base(
        "[permissions.backend]\ntype = \"http\"\nbase_url = \"http://db.local\"\nallow_http = true\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    let config = BlobGateConfig::from_toml_str(&opted_in).map_err(|err| err.to_string())?;
    match config.permissions.backend {
        PermissionBackendConfig::Http(http) if http.collection == "permissions" => Ok(()),
        _ => Err("expected http backend with default collection".to_string()),
    }
}

#[test]
fn http_backend_collection_validated() -> TestResult {
    let content = base(
        "[permissions.backend]\ntype = \"http\"\nbase_url = \"https://db.local\"\n\
         collection = \"perm/../x\"\n[storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&content, "permissions.backend.collection must be alphanumeric")
}

#[test]
fn static_records_parse() -> TestResult {
    let content = base(
        r#"[permissions.backend]
type = "static"

[[permissions.backend.records]]
principal_id = "alice"
resource_pattern = "docs/*"
actions = ["read", "write"]
updated_at = 1

[storage.provider]
type = "memory"
objects = ["docs/a.pdf"]
"#,
    );
    let config = BlobGateConfig::from_toml_str(&content).map_err(|err| err.to_string())?;
    let PermissionBackendConfig::Static(backend) = &config.permissions.backend else {
        return Err("expected static backend".to_string());
    };
    let record = backend.records.first().ok_or("missing record")?;
    if record.actions != ActionSet::only(Action::Read).with(Action::Write) {
        return Err("record actions mismatch".to_string());
    }
    let GrantProviderConfig::Memory(memory) = &config.storage.provider else {
        return Err("expected memory provider".to_string());
    };
    if memory.resources().map_err(|err| err.to_string())?.len() != 1 {
        return Err("expected one seeded object".to_string());
    }
    Ok(())
}

#[test]
fn memory_objects_must_be_valid_resources() -> TestResult {
    let content = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"memory\"\n\
         objects = [\"../escape\"]\n",
    );
    expect_invalid(&content, "storage.provider.objects entry '../escape'")
}

#[test]
fn grant_ttl_bounds_enforced() -> TestResult {
    let over_max = base(
        "[permissions.backend]\ntype = \"static\"\n[storage]\nmax_ttl_secs = 604801\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&over_max, "storage.max_ttl_secs must be between")?;
    let default_above_max = base(
        "[permissions.backend]\ntype = \"static\"\n[storage]\ndefault_ttl_secs = 7200\n\
         max_ttl_secs = 3600\n[storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&default_above_max, "storage.default_ttl_secs must be between")
}

#[test]
fn custom_upload_policy_normalizes_extensions() -> TestResult {
    let content = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.uploads]\npolicy = \"custom\"\n\
         extensions = [\".PNG\", \"jpg\"]\n[storage.provider]\ntype = \"memory\"\n",
    );
    let config = BlobGateConfig::from_toml_str(&content).map_err(|err| err.to_string())?;
    let extensions = config.storage.settings().upload_extensions.ok_or("expected extensions")?;
    if !(extensions.contains("png") && extensions.contains("jpg") && extensions.len() == 2) {
        return Err("extensions not normalized".to_string());
    }
    let stray = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.uploads]\nextensions = [\"png\"]\n\
         [storage.provider]\ntype = \"memory\"\n",
    );
    expect_invalid(&stray, "requires policy = \"custom\"")
}

#[test]
fn s3_provider_validation() -> TestResult {
    let empty_bucket = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"s3\"\nbucket = \" \"\n",
    );
    expect_invalid(&empty_bucket, "storage.provider.bucket must be set")?;
    let absolute_prefix = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"s3\"\n\
         bucket = \"b\"\nprefix = \"/abs\"\n",
    );
    expect_invalid(&absolute_prefix, "storage.provider.prefix must be relative")?;
    let valid = base(
        "[permissions.backend]\ntype = \"static\"\n[storage.provider]\ntype = \"s3\"\n\
         bucket = \"b\"\nprefix = \"tenants/main/\"\nendpoint = \"https://s3.local\"\n",
    );
    let config = BlobGateConfig::from_toml_str(&valid).map_err(|err| err.to_string())?;
    let GrantProviderConfig::S3(s3) = &config.storage.provider else {
        return Err("expected s3 provider".to_string());
    };
    if s3.normalized_prefix().as_deref() != Some("tenants/main/") {
        return Err("prefix not normalized".to_string());
    }
    Ok(())
}

#[test]
fn audit_file_sink_requires_path() -> TestResult {
    expect_invalid(&minimal("[audit]\nsink = \"file\"\n"), "audit.path is required")?;
    expect_invalid(
        &minimal("[audit]\nsink = \"none\"\npath = \"audit.log\"\n"),
        "audit.path is only valid for file sink",
    )?;
    let config = BlobGateConfig::from_toml_str(&minimal("[audit]\nsink = \"file\"\npath = \"audit.log\"\n"))
        .map_err(|err| err.to_string())?;
    if config.audit.sink != AuditSinkKind::File {
        return Err("expected file sink".to_string());
    }
    Ok(())
}

#[test]
fn gateway_timeout_bounds_enforced() -> TestResult {
    expect_invalid(
        &minimal("[gateway]\nrequest_timeout_ms = 5\n"),
        "gateway.request_timeout_ms must be between",
    )
}
