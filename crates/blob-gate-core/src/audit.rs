// crates/blob-gate-core/src/audit.rs
// ============================================================================
// Module: Blob Gate Audit Logging
// Description: Structured audit records for access requests.
// Purpose: Emit one redacted JSON-lines record per gateway request.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! Every access request produces exactly one [`AccessAuditRecord`], whether it
//! ends in a grant or a rejection. Records never contain the raw token or
//! capability URLs; callers are correlated through the request id and the
//! token fingerprint. Sinks are lightweight so deployments can route records
//! into their own logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::action::ActionSet;
use crate::core::errors::ReasonCategory;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit record for one access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessAuditRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Record timestamp.
    pub timestamp_ms: Timestamp,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Outcome label (`granted` or `rejected`).
    pub outcome: &'static str,
    /// Stage label at which the request finished.
    pub stage: &'static str,
    /// Principal identifier once the token verified.
    pub principal_id: Option<String>,
    /// Token issuer once the token verified.
    pub issuer: Option<String>,
    /// SHA-256 fingerprint of the presented token.
    pub token_fingerprint: Option<String>,
    /// Resource reference as presented.
    pub resource: String,
    /// Requested actions.
    pub requested_actions: ActionSet,
    /// Actions granted (empty on rejection).
    pub granted_actions: ActionSet,
    /// Rejection reason label.
    pub reason: Option<&'static str>,
    /// Rejection detail (denial sub-reason or error text).
    pub reason_detail: Option<String>,
    /// Rejection category.
    pub category: Option<ReasonCategory>,
    /// Grant expiry when granted.
    pub grant_expires_at: Option<Timestamp>,
    /// Request latency in milliseconds.
    pub latency_ms: u64,
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for access records.
pub trait AuditSink: Send + Sync {
    /// Records one access audit record.
    fn record(&self, record: &AccessAuditRecord);
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, record: &AccessAuditRecord) {
        if let Ok(payload) = serde_json::to_string(record) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
#[derive(Debug)]
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, record: &AccessAuditRecord) {
        if let Ok(payload) = serde_json::to_string(record)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: &AccessAuditRecord) {}
}

/// Audit sink that keeps records in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    /// Recorded entries in arrival order.
    records: Mutex<Vec<AccessAuditRecord>>,
}

impl InMemoryAuditSink {
    /// Returns a copy of every recorded entry.
    #[must_use]
    pub fn records(&self) -> Vec<AccessAuditRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or_default()
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: &AccessAuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
