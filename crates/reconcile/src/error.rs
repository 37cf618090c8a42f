//! Pass error types.

use docrelay_source::SourceError;
use docrelay_transport::TransportError;

/// Why a reconciliation pass stopped.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("listing failed: {0}")]
    Listing(#[source] SourceError),

    #[error("could not open transport session: {0}")]
    Connect(#[source] TransportError),

    #[error("could not acquire {id}: {source}")]
    Acquisition { id: String, source: SourceError },

    #[error("transfer of {id} failed: {source}")]
    Transport { id: String, source: TransportError },

    #[error("{id} was transferred but could not be marked delivered: {source}")]
    Mark { id: String, source: SourceError },
}

impl PassError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PassError::Listing(_) => "listing",
            PassError::Connect(_) => "connect",
            PassError::Acquisition { .. } => "acquisition",
            PassError::Transport { .. } => "transport",
            PassError::Mark { .. } => "mark",
        }
    }

    /// The document being processed when the pass stopped, if any.
    pub fn document(&self) -> Option<&str> {
        match self {
            PassError::Acquisition { id, .. }
            | PassError::Transport { id, .. }
            | PassError::Mark { id, .. } => Some(id),
            PassError::Listing(_) | PassError::Connect(_) => None,
        }
    }

    /// True when a transport operation ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            PassError::Connect(e) | PassError::Transport { source: e, .. } => e.is_timeout(),
            _ => false,
        }
    }
}
