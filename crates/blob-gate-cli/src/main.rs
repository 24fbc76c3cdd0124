// crates/blob-gate-cli/src/main.rs
// ============================================================================
// Module: Blob Gate CLI Entry Point
// Description: Command dispatcher for Blob Gate operator workflows.
// Purpose: Validate config, manage keys, mint tokens, and run access checks.
// Dependencies: blob-gate-config, blob-gate-core, blob-gate-providers, clap, tokio
// ============================================================================

//! ## Overview
//! The `blob-gate` binary is the operator surface of the gateway. It validates
//! `blob-gate.toml`, generates ed25519 key pairs, mints and verifies bearer
//! tokens, and runs one access request through a gateway built from config.
//! Inputs are untrusted: key files are read under a size limit and existing
//! key files are never overwritten.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blob_gate_config::BlobGateConfig;
use blob_gate_config::config_toml_example;
use blob_gate_core::AccessRequest;
use blob_gate_core::Action;
use blob_gate_core::ActionSet;
use blob_gate_core::Clock;
use blob_gate_core::KeyId;
use blob_gate_core::KeySetHandle;
use blob_gate_core::SystemClock;
use blob_gate_core::Timestamp;
use blob_gate_core::TokenClaims;
use blob_gate_core::TokenSigner;
use blob_gate_core::TokenVerifier;
use blob_gate_core::runtime::Audience;
use blob_gate_core::runtime::parse_bearer_token;
use blob_gate_providers::build_gateway;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ed25519_dalek::SigningKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size for signing key material.
const MAX_SIGNING_KEY_BYTES: usize = 8 * 1024;
/// Longest token lifetime the CLI will mint (30 days).
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "blob-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate an ed25519 key pair for token signing.
    Keygen(KeygenCommand),
    /// Bearer token utilities.
    Token {
        /// Selected token subcommand.
        #[command(subcommand)]
        command: TokenCommand,
    },
    /// Run access requests through a configured gateway.
    Access {
        /// Selected access subcommand.
        #[command(subcommand)]
        command: AccessCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a Blob Gate configuration file.
    Validate(ConfigValidateCommand),
    /// Print an annotated example configuration.
    Example,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a signed bearer token.
    Mint(TokenMintCommand),
    /// Verify a bearer token against configured keys.
    Verify(TokenVerifyCommand),
}

/// Access subcommands.
#[derive(Subcommand, Debug)]
enum AccessCommand {
    /// Request a storage grant for one resource.
    Request(AccessRequestCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

/// Arguments for `keygen`.
#[derive(Args, Debug)]
struct KeygenCommand {
    /// Directory receiving `<name>.key` and `<name>.pub`.
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: PathBuf,
    /// Base file name for the key pair.
    #[arg(long, value_name = "NAME", default_value = "blob-gate")]
    name: String,
}

/// Arguments for `token mint`.
#[derive(Args, Debug)]
struct TokenMintCommand {
    /// Signing key file (raw 32 bytes or base64).
    #[arg(long = "signing-key", value_name = "PATH")]
    signing_key: PathBuf,
    /// Token issuer.
    #[arg(long, value_name = "ISSUER")]
    issuer: String,
    /// Token subject (principal id).
    #[arg(long, value_name = "SUBJECT")]
    subject: String,
    /// Token lifetime in seconds.
    #[arg(long = "ttl-secs", value_name = "SECONDS", default_value_t = 3600)]
    ttl_secs: u64,
    /// Optional audience claim.
    #[arg(long, value_name = "AUDIENCE")]
    audience: Option<String>,
    /// Scopes to embed (repeatable).
    #[arg(long = "scope", value_name = "SCOPE")]
    scopes: Vec<String>,
    /// Key identifier written into the token header.
    #[arg(long = "key-id", value_name = "KID")]
    key_id: Option<String>,
}

/// Token input shared by commands that consume a bearer token.
#[derive(Args, Debug)]
struct TokenInput {
    /// Raw bearer token.
    #[arg(long, value_name = "TOKEN", conflicts_with = "authorization")]
    token: Option<String>,
    /// Full `Authorization` header value (`Bearer <token>`).
    #[arg(long, value_name = "HEADER", required_unless_present = "token")]
    authorization: Option<String>,
}

/// Arguments for `token verify`.
#[derive(Args, Debug)]
struct TokenVerifyCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Token to verify.
    #[command(flatten)]
    input: TokenInput,
}

/// Arguments for `access request`.
#[derive(Args, Debug)]
struct AccessRequestCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Caller token.
    #[command(flatten)]
    input: TokenInput,
    /// Resource reference to access.
    #[arg(long, value_name = "RESOURCE")]
    resource: String,
    /// Requested actions (repeatable: read, write, delete).
    #[arg(long = "action", value_name = "ACTION", required = true)]
    actions: Vec<Action>,
    /// Requested grant lifetime in seconds.
    #[arg(long = "ttl-secs", value_name = "SECONDS")]
    ttl_secs: Option<u64>,
    /// Correlation id recorded in the audit trail.
    #[arg(long = "request-id", value_name = "ID")]
    request_id: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Bounded read failures.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Keygen(command) => command_keygen(&command),
        Commands::Token {
            command,
        } => match command {
            TokenCommand::Mint(command) => command_token_mint(&command),
            TokenCommand::Verify(command) => command_token_verify(&command),
        },
        Commands::Access {
            command,
        } => match command {
            AccessCommand::Request(command) => command_access_request(command).await,
        },
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let keys = config
        .verification_keys()
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!("config valid: {} verification key(s)", keys.len()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates a config file.
fn load_config(path: &Path) -> CliResult<BlobGateConfig> {
    BlobGateConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Key Commands
// ============================================================================

/// Key pair file locations written by `keygen`.
#[derive(Debug, Serialize)]
struct KeygenOutput {
    /// Secret key path.
    signing_key: String,
    /// Public key path.
    public_key: String,
    /// Base64 public key for `verifier.keys`.
    public_key_base64: String,
}

/// Executes the key generation command.
fn command_keygen(command: &KeygenCommand) -> CliResult<ExitCode> {
    let mut secret = [0_u8; 32];
    OsRng.fill_bytes(&mut secret);
    let output = write_key_pair(&command.out_dir, &command.name, &SigningKey::from_bytes(&secret))?;
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Writes `<name>.key` and `<name>.pub` under `dir`, refusing to overwrite.
fn write_key_pair(dir: &Path, name: &str, key: &SigningKey) -> CliResult<KeygenOutput> {
    validate_key_name(name)?;
    let secret_path = dir.join(format!("{name}.key"));
    let public_path = dir.join(format!("{name}.pub"));
    for path in [&secret_path, &public_path] {
        if path.exists() {
            return Err(CliError::new(format!("refusing to overwrite {}", path.display())));
        }
    }
    let public_key_base64 = BASE64.encode(key.verifying_key().to_bytes());
    write_new_file(&secret_path, &BASE64.encode(key.to_bytes()))?;
    write_new_file(&public_path, &public_key_base64)?;
    Ok(KeygenOutput {
        signing_key: secret_path.display().to_string(),
        public_key: public_path.display().to_string(),
        public_key_base64,
    })
}

/// Rejects key names that would escape the output directory.
fn validate_key_name(name: &str) -> CliResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(CliError::new(format!("invalid key name '{name}': use [A-Za-z0-9_-], max 64")))
    }
}

/// Creates `path` exclusively and writes `contents` plus a newline.
fn write_new_file(path: &Path, contents: &str) -> CliResult<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|err| CliError::new(format!("failed to create {}: {err}", path.display())))?;
    writeln!(file, "{contents}")
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))
}

/// Loads a signing key from disk.
fn load_signing_key(path: &Path) -> CliResult<SigningKey> {
    let bytes = read_bytes_with_limit(path, MAX_SIGNING_KEY_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read signing key {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "signing key {} is too large ({size} bytes, limit {limit})",
            path.display()
        )),
    })?;
    if bytes.len() == 32 {
        let key: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CliError::new("invalid signing key".to_string()))?;
        return Ok(SigningKey::from_bytes(&key));
    }
    let text =
        std::str::from_utf8(&bytes).map_err(|_| CliError::new("invalid signing key".to_string()))?;
    let decoded = BASE64
        .decode(text.trim().as_bytes())
        .map_err(|_| CliError::new("invalid signing key".to_string()))?;
    let key: [u8; 32] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| CliError::new("invalid signing key".to_string()))?;
    Ok(SigningKey::from_bytes(&key))
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Token Commands
// ============================================================================

/// Executes the token mint command.
fn command_token_mint(command: &TokenMintCommand) -> CliResult<ExitCode> {
    let key = load_signing_key(&command.signing_key)?;
    let signer = TokenSigner::new(key, command.key_id.as_deref().map(KeyId::new));
    let claims = mint_claims(command, SystemClock.now())?;
    let token = signer.sign(&claims).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&token).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the claims for `token mint` relative to `now`.
fn mint_claims(command: &TokenMintCommand, now: Timestamp) -> CliResult<TokenClaims> {
    if command.ttl_secs == 0 || command.ttl_secs > MAX_TOKEN_TTL_SECS {
        return Err(CliError::new(format!(
            "ttl-secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
        )));
    }
    let issued_at = now.as_unix_millis() / 1000;
    let ttl = i64::try_from(command.ttl_secs)
        .map_err(|_| CliError::new("ttl-secs out of range".to_string()))?;
    let mut claims = TokenClaims::new(
        command.subject.trim(),
        command.issuer.trim(),
        issued_at.saturating_add(ttl),
    );
    claims.iat = Some(issued_at);
    claims.aud = command.audience.as_ref().map(|audience| Audience::One(audience.clone()));
    if !command.scopes.is_empty() {
        claims.scopes = Some(command.scopes.clone());
    }
    Ok(claims)
}

/// Executes the token verify command.
fn command_token_verify(command: &TokenVerifyCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let keys = config
        .verification_keys()
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let verifier = TokenVerifier::new(KeySetHandle::new(keys), config.verifier.settings());
    let token = resolve_token(&command.input)?;
    match verifier.verify(&token, SystemClock.now()) {
        Ok(principal) => {
            write_json(&principal)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(emit_error(&format!("token rejected: {err}"))),
    }
}

/// Resolves the raw token from `--token` or `--authorization`.
fn resolve_token(input: &TokenInput) -> CliResult<String> {
    if let Some(token) = &input.token {
        let token = token.trim();
        if token.is_empty() {
            return Err(CliError::new("token must not be empty".to_string()));
        }
        return Ok(token.to_string());
    }
    parse_bearer_token(input.authorization.as_deref()).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Access Commands
// ============================================================================

/// Executes the access request command. Exits non-zero when rejected.
async fn command_access_request(command: AccessRequestCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let gateway = build_gateway(&config)
        .await
        .map_err(|err| CliError::new(format!("failed to build gateway: {err}")))?;
    let request = build_access_request(command)?;
    let outcome = gateway.request_access(request).await;
    write_json(&outcome)?;
    if outcome.rejection().is_some() { Ok(ExitCode::FAILURE) } else { Ok(ExitCode::SUCCESS) }
}

/// Converts command arguments into an [`AccessRequest`].
fn build_access_request(command: AccessRequestCommand) -> CliResult<AccessRequest> {
    let token = resolve_token(&command.input)?;
    let actions: ActionSet = command.actions.into_iter().collect();
    let mut request = AccessRequest::new(token, command.resource, actions);
    if let Some(ttl) = command.ttl_secs {
        request = request.with_ttl(Duration::from_secs(ttl));
    }
    if let Some(request_id) = command.request_id {
        request = request.with_request_id(request_id);
    }
    Ok(request)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes `value` to stdout as pretty JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
