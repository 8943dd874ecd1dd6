//! Append-only audit log.
//!
//! Every security-relevant decision is appended as one JSON object per
//! line (UTF-8, LF). Appends are flushed and fsynced before returning,
//! and all writes go through a single file handle behind a mutex, so
//! entries within one process are totally ordered.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use wd_domain::error::{Error, Result};

/// Severity marker attached to honeytoken and blocked-secret entries.
pub const SEVERITY_CRITICAL: &str = "critical";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    RiskDecision,
    ToolProposed,
    ToolExecuted,
    StepConcluded,
    StepFailed,
    ApprovalRequested,
    ApprovalApproved,
    ApprovalRejected,
    ApprovalExpired,
    ApprovalInvalid,
    IntegrityMismatch,
    OutputEvicted,
    SecretDetected,
    OracleFailure,
    ThreadCancelled,
    ThreadQuarantined,
    ThreadDeleted,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskDecision => "risk_decision",
            Self::ToolProposed => "tool_proposed",
            Self::ToolExecuted => "tool_executed",
            Self::StepConcluded => "step_concluded",
            Self::StepFailed => "step_failed",
            Self::ApprovalRequested => "approval_requested",
            Self::ApprovalApproved => "approval_approved",
            Self::ApprovalRejected => "approval_rejected",
            Self::ApprovalExpired => "approval_expired",
            Self::ApprovalInvalid => "approval_invalid",
            Self::IntegrityMismatch => "integrity_mismatch",
            Self::OutputEvicted => "output_evicted",
            Self::SecretDetected => "secret_detected",
            Self::OracleFailure => "oracle_failure",
            Self::ThreadCancelled => "thread_cancelled",
            Self::ThreadQuarantined => "thread_quarantined",
            Self::ThreadDeleted => "thread_deleted",
        }
    }
}

/// One audit log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unix seconds.
    pub ts: i64,
    pub thread_id: String,
    pub user_id: String,
    pub kind: AuditKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(thread_id: &str, user_id: &str, kind: AuditKind) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp(),
            thread_id: thread_id.to_owned(),
            user_id: user_id.to_owned(),
            kind,
            tool_name: None,
            args_hash: None,
            decision: None,
            reason: None,
            severity: None,
            extra: None,
        }
    }

    pub fn tool(mut self, name: &str, args_hash: &str) -> Self {
        self.tool_name = Some(name.to_owned());
        self.args_hash = Some(args_hash.to_owned());
        self
    }

    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn critical(mut self) -> Self {
        self.severity = Some(SEVERITY_CRITICAL.to_owned());
        self
    }

    pub fn extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Log
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Append-only JSONL audit sink.
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (create-or-append) the log file, creating parent directories
    /// as needed. Rotation is an operator concern.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(Error::Io)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append one entry and fsync it to disk before returning.
    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| Error::Other(format!("serializing audit entry: {e}")))?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes()).map_err(Error::Io)?;
        file.flush().map_err(Error::Io)?;
        file.sync_data().map_err(Error::Io)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full log back (tests and operator tooling).
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        let raw = std::fs::read_to_string(&self.path).map_err(Error::Io)?;
        let mut entries = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed audit line");
                }
            }
        }
        Ok(entries)
    }
}
