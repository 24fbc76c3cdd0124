// crates/blob-gate-config/src/lib.rs
// ============================================================================
// Module: Blob Gate Config Library
// Description: Canonical config model, validation, and settings conversion.
// Purpose: Single source of truth for blob-gate.toml semantics.
// Dependencies: blob-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `blob-gate-config` defines the configuration model for Blob Gate. It
//! provides strict, fail-closed validation and converts each validated section
//! into the settings type its core component consumes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
