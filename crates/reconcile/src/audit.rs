//! Append-only audit logs.
//!
//! Two line-oriented text files: one line per delivered document, one
//! line per failed pass. Each write opens the file in append mode, so the
//! logs can be rotated or truncated externally at any time. They are an
//! audit trail only and never consulted when deciding what to send.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncWriteExt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default success log file name.
pub const DEFAULT_SUCCESS_LOG: &str = "docrelay-transfer-log.txt";

/// Default error log file name.
pub const DEFAULT_ERROR_LOG: &str = "docrelay-transfer-error.txt";

/// A delivered document: `<timestamp> <name> <bytes>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub size: u64,
}

impl LogEntry {
    pub fn now(name: impl Into<String>, size: u64) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            name: name.into(),
            size,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.name,
            self.size
        )
    }
}

/// A failed pass: `<timestamp> <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp.format(TIMESTAMP_FORMAT), self.message)
    }
}

/// Locations of the success and error logs.
#[derive(Debug, Clone)]
pub struct AuditLog {
    success_path: PathBuf,
    error_path: PathBuf,
}

impl AuditLog {
    pub fn new(success_path: impl Into<PathBuf>, error_path: impl Into<PathBuf>) -> Self {
        Self {
            success_path: success_path.into(),
            error_path: error_path.into(),
        }
    }

    /// Uses the default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_SUCCESS_LOG), dir.join(DEFAULT_ERROR_LOG))
    }

    pub fn success_path(&self) -> &Path {
        &self.success_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    pub async fn record_delivery(&self, entry: &LogEntry) -> std::io::Result<()> {
        append_line(&self.success_path, &entry.to_string()).await
    }

    pub async fn record_error(&self, entry: &ErrorLogEntry) -> std::io::Result<()> {
        // Keep one entry per line even for multi-line error chains.
        let line = entry.to_string().replace(['\r', '\n'], " ");
        append_line(&self.error_path, &line).await
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}
