//! Config load validation tests for blob-gate-config.
// crates/blob-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, keys).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use blob_gate_config::BlobGateConfig;
use blob_gate_config::ConfigError;
use blob_gate_config::config_toml_example;
use blob_gate_config::examples::EXAMPLE_PUBLIC_KEY;
use tempfile::NamedTempFile;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<BlobGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn static_config(keys: &str) -> String {
    format!(
        r#"[verifier]
trusted_issuers = ["https://id.test"]
{keys}

[permissions.backend]
type = "static"

[storage.provider]
type = "memory"
"#
    )
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(BlobGateConfig::load(Path::new(&long_path)), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        BlobGateConfig::load(Path::new(&long_component)),
        "config path component too long",
    )
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    assert_invalid(BlobGateConfig::load(&dir.path().join("absent.toml")), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&vec![b'#'; 1_048_577]).map_err(|err| err.to_string())?;
    assert_invalid(BlobGateConfig::load(file.path()), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(BlobGateConfig::load(file.path()), "config file must be utf-8")
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[verifier\n").map_err(|err| err.to_string())?;
    assert_invalid(BlobGateConfig::load(file.path()), "config parse error")
}

#[test]
fn example_config_loads_and_converts() -> TestResult {
    let config =
        BlobGateConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    let keys = config.verification_keys().map_err(|err| err.to_string())?;
    if keys.len() != 1 {
        return Err(format!("expected one key, got {}", keys.len()));
    }
    let broker = config.storage.settings();
    if broker.default_ttl.as_secs() != 900 {
        return Err("default ttl should be 15 minutes".to_string());
    }
    let uploads = broker.upload_extensions.ok_or("documents policy sets extensions")?;
    if !uploads.contains("pdf") || uploads.contains("exe") {
        return Err("unexpected upload extensions".to_string());
    }
    if config.gateway.settings().request_timeout.as_millis() != 10_000 {
        return Err("request timeout mismatch".to_string());
    }
    Ok(())
}

#[test]
fn key_file_resolves_relative_to_config_dir() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    std::fs::create_dir(dir.path().join("keys")).map_err(|err| err.to_string())?;
    std::fs::write(dir.path().join("keys/primary.pub"), format!("{EXAMPLE_PUBLIC_KEY}\n"))
        .map_err(|err| err.to_string())?;
    let config_path = dir.path().join("blob-gate.toml");
    std::fs::write(
        &config_path,
        static_config("[[verifier.keys]]\nkey_id = \"k1\"\npublic_key_file = \"keys/primary.pub\""),
    )
    .map_err(|err| err.to_string())?;

    let config = BlobGateConfig::load(&config_path).map_err(|err| err.to_string())?;
    let keys = config.verification_keys().map_err(|err| err.to_string())?;
    if keys.len() != 1 {
        return Err("expected key from file".to_string());
    }
    Ok(())
}

#[test]
fn invalid_inline_key_fails_on_conversion() -> TestResult {
    let config = BlobGateConfig::from_toml_str(&static_config(
        "[[verifier.keys]]\npublic_key = \"not-base64!\"",
    ))
    .map_err(|err| err.to_string())?;
    match config.verification_keys() {
        Err(err) if err.to_string().contains("verifier.keys[0]") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected key conversion failure".to_string()),
    }
}

#[test]
fn key_requires_exactly_one_source() -> TestResult {
    assert_invalid(
        BlobGateConfig::from_toml_str(&static_config("[[verifier.keys]]\nkey_id = \"k1\"")),
        "exactly one of public_key or public_key_file",
    )?;
    assert_invalid(
        BlobGateConfig::from_toml_str(&static_config(&format!(
            "[[verifier.keys]]\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\"\npublic_key_file = \"k.pub\""
        ))),
        "exactly one of public_key or public_key_file",
    )
}

#[test]
fn duplicate_key_ids_rejected() -> TestResult {
    let keys = format!(
        "[[verifier.keys]]\nkey_id = \"k1\"\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\"\n\
         [[verifier.keys]]\nkey_id = \"k1\"\npublic_key = \"{EXAMPLE_PUBLIC_KEY}\""
    );
    assert_invalid(BlobGateConfig::from_toml_str(&static_config(&keys)), "duplicates k1")
}
