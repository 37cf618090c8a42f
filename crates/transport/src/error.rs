//! Transport error types.

use std::time::Duration;

/// Errors produced by delivery transports.
///
/// The loop treats every variant the same way (abort the pass), but
/// timeouts and rejections are kept apart for the logs.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("credential unavailable: {0}")]
    Credential(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Rejected(_) => "rejected",
            TransportError::Io(_) => "io",
            TransportError::Protocol(_) => "protocol",
            TransportError::Credential(_) => "credential",
        }
    }
}
