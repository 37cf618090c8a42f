//! One reconciliation pass.
//!
//! Candidates are processed strictly in listing order, one at a time,
//! over a single transport session. A document is either fully
//! delivered and marked, or left pending for the next pass.

use docrelay_source::{Document, DocumentSource};
use docrelay_transport::{Session, Transport, TransportError};
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, LogEntry};
use crate::error::PassError;

/// What a completed pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Pending documents found at the start of the pass.
    pub listed: usize,
    /// Documents transferred in this pass.
    pub delivered: Vec<String>,
    /// Documents found on the remote side and only marked.
    pub skipped: Vec<String>,
    /// Delivered documents whose marking failed; the remote check keeps
    /// them from being sent again.
    pub deferred_marks: Vec<String>,
}

impl PassOutcome {
    /// True when there was nothing to do.
    pub fn is_idle(&self) -> bool {
        self.listed == 0
    }
}

/// Drives a source and a transport through reconciliation passes.
pub struct Reconciler {
    source: Box<dyn DocumentSource>,
    transport: Box<dyn Transport>,
    audit: AuditLog,
}

impl Reconciler {
    pub fn new(
        source: Box<dyn DocumentSource>,
        transport: Box<dyn Transport>,
        audit: AuditLog,
    ) -> Self {
        Self {
            source,
            transport,
            audit,
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Runs a single pass.
    ///
    /// The candidate list is taken once up front. No transport session is
    /// opened when it is empty. Errors are returned, not reported; the
    /// caller decides how to surface them.
    pub async fn run_one_pass(&self) -> Result<PassOutcome, PassError> {
        let candidates = self.source.list().await.map_err(PassError::Listing)?;
        let mut outcome = PassOutcome {
            listed: candidates.len(),
            ..PassOutcome::default()
        };

        if candidates.is_empty() {
            debug!(source = %self.source.describe(), "no pending documents");
            return Ok(outcome);
        }

        info!(
            pending = candidates.len(),
            source = %self.source.describe(),
            remote = %self.transport.describe(),
            "starting transfers"
        );

        let mut session = self.transport.connect().await.map_err(PassError::Connect)?;

        let mut result = Ok(());
        for doc in &candidates {
            result = self.process(session.as_mut(), doc, &mut outcome).await;
            if result.is_err() {
                break;
            }
        }

        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close transport session");
        }

        result.map(|()| outcome)
    }

    async fn process(
        &self,
        session: &mut dyn Session,
        doc: &Document,
        outcome: &mut PassOutcome,
    ) -> Result<(), PassError> {
        let transport_err = |source: TransportError| PassError::Transport {
            id: doc.id.clone(),
            source,
        };

        // Dropped at the end of this function on every path.
        let staged = self
            .source
            .stage(doc)
            .await
            .map_err(|source| PassError::Acquisition {
                id: doc.id.clone(),
                source,
            })?;

        if session
            .already_delivered(doc.name())
            .await
            .map_err(transport_err)?
        {
            info!(doc = %doc, "already on remote, skipping transfer");
            outcome.skipped.push(doc.id.clone());
        } else {
            let sent = session
                .send(staged.path(), doc.name())
                .await
                .map_err(transport_err)?;
            info!(doc = %doc, bytes = sent, "delivered");

            if let Err(e) = self.audit.record_delivery(&LogEntry::now(doc.name(), sent)).await {
                warn!(doc = %doc, error = %e, path = %self.audit.success_path().display(), "failed to write success log");
            }
            outcome.delivered.push(doc.id.clone());
        }

        match self.source.mark_delivered(doc).await {
            Ok(mark) => debug!(doc = %doc, ?mark, "marked delivered"),
            Err(e) if session.detects_duplicates() => {
                warn!(doc = %doc, error = %e, "mark failed, remote check will prevent a re-send");
                outcome.deferred_marks.push(doc.id.clone());
            }
            Err(source) => {
                return Err(PassError::Mark {
                    id: doc.id.clone(),
                    source,
                });
            }
        }

        drop(staged);
        Ok(())
    }
}
