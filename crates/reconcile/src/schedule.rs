//! Pass scheduling.
//!
//! Passes never overlap: the scheduler awaits a pass, reports its failure
//! if any, then sleeps for the fixed interval. The shutdown token is only
//! observed while sleeping, so an in-flight pass always runs to completion
//! (or to its transport timeout).

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::error::PassError;
use crate::pass::{PassOutcome, Reconciler};
use crate::report::FailureReporter;

/// Default interval between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// When passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// One pass, then return.
    Once,
    /// A pass, then a fixed sleep, forever.
    Every(Duration),
}

pub struct Scheduler {
    reconciler: Reconciler,
    reporter: FailureReporter,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(reconciler: Reconciler, reporter: FailureReporter, schedule: Schedule) -> Self {
        Self {
            reconciler,
            reporter,
            schedule,
        }
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Runs one pass and reports its failure exactly once.
    pub async fn run_pass(&self) -> Result<PassOutcome, PassError> {
        let span = info_span!("pass", id = %Uuid::new_v4());

        async {
            let result = self.reconciler.run_one_pass().await;
            match &result {
                Ok(outcome) if outcome.is_idle() => {}
                Ok(outcome) => info!(
                    delivered = outcome.delivered.len(),
                    skipped = outcome.skipped.len(),
                    deferred_marks = outcome.deferred_marks.len(),
                    "pass complete"
                ),
                Err(e) => self.reporter.report(e).await,
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Runs according to the schedule.
    ///
    /// `Once` returns the pass result. `Every` only returns after
    /// `shutdown` is cancelled; failed passes are reported and retried on
    /// the next tick.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), PassError> {
        match self.schedule {
            Schedule::Once => self.run_pass().await.map(|_| ()),
            Schedule::Every(interval) => {
                info!(interval_secs = interval.as_secs(), "polling");
                loop {
                    // Already reported.
                    let _ = self.run_pass().await;

                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("shutdown requested, stopping between passes");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
            }
        }
    }

    /// Runs exactly `passes` passes with the configured interval between
    /// them, returning every result.
    pub async fn run_passes(&self, passes: usize) -> Vec<Result<PassOutcome, PassError>> {
        let interval = match self.schedule {
            Schedule::Once => Duration::ZERO,
            Schedule::Every(interval) => interval,
        };

        let mut results = Vec::with_capacity(passes);
        for n in 0..passes {
            if n > 0 {
                tokio::time::sleep(interval).await;
            }
            results.push(self.run_pass().await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use docrelay_alert::{Alert, AlertFuture, Alerter};
    use docrelay_source::{
        CompletionMarker, Document, DocumentSource, MarkOutcome, SourceError, SourceFuture,
        SourceLister, StagedDocument, Stager,
    };
    use docrelay_transport::{Session, Transport, TransportFuture};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// Source that records when it was listed and can be told to fail.
    #[derive(Clone, Default)]
    struct ClockedSource {
        listed_at: Arc<Mutex<Vec<Instant>>>,
        fail: bool,
    }

    impl SourceLister for ClockedSource {
        fn list(&self) -> SourceFuture<'_, Vec<Document>> {
            Box::pin(async move {
                self.listed_at.lock().unwrap().push(Instant::now());
                if self.fail {
                    return Err(SourceError::Store("offline".into()));
                }
                Ok(Vec::new())
            })
        }
    }

    impl Stager for ClockedSource {
        fn stage<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, StagedDocument> {
            Box::pin(async move { Err(SourceError::NotFound(doc.id.clone())) })
        }
    }

    impl CompletionMarker for ClockedSource {
        fn mark_delivered<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, MarkOutcome> {
            Box::pin(async move { Err(SourceError::NotFound(doc.id.clone())) })
        }
    }

    impl DocumentSource for ClockedSource {
        fn describe(&self) -> String {
            "clocked".into()
        }
    }

    struct UnusedTransport;

    impl Transport for UnusedTransport {
        fn describe(&self) -> String {
            "unused".into()
        }

        fn connect(&self) -> TransportFuture<'_, Box<dyn Session>> {
            Box::pin(async { Err(docrelay_transport::TransportError::Rejected("unused".into())) })
        }
    }

    #[derive(Clone, Default)]
    struct CountingAlerter(Arc<Mutex<usize>>);

    impl Alerter for CountingAlerter {
        fn publish<'a>(&'a self, _alert: &'a Alert) -> AlertFuture<'a> {
            Box::pin(async move {
                *self.0.lock().unwrap() += 1;
                Ok(())
            })
        }
    }

    fn scheduler(
        source: ClockedSource,
        alerter: CountingAlerter,
        dir: &std::path::Path,
        schedule: Schedule,
    ) -> Scheduler {
        let audit = AuditLog::in_dir(dir);
        Scheduler::new(
            Reconciler::new(Box::new(source), Box::new(UnusedTransport), audit.clone()),
            FailureReporter::new(Box::new(alerter), audit),
            schedule,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn passes_are_spaced_by_interval() {
        let dir = tempfile::tempdir().unwrap();
        let source = ClockedSource::default();
        let sched = scheduler(
            source.clone(),
            CountingAlerter::default(),
            dir.path(),
            Schedule::Every(Duration::from_secs(60)),
        );

        let results = sched.run_passes(3).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let times = source.listed_at.lock().unwrap();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(60));
        assert_eq!(times[2] - times[1], Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn each_failed_pass_alerts_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = ClockedSource {
            fail: true,
            ..ClockedSource::default()
        };
        let alerter = CountingAlerter::default();
        let sched = scheduler(
            source,
            alerter.clone(),
            dir.path(),
            Schedule::Every(Duration::from_secs(60)),
        );

        let results = sched.run_passes(2).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(*alerter.0.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn once_returns_pass_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ClockedSource {
            fail: true,
            ..ClockedSource::default()
        };
        let alerter = CountingAlerter::default();
        let sched = scheduler(source.clone(), alerter.clone(), dir.path(), Schedule::Once);

        let err = sched.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), "listing");
        assert_eq!(source.listed_at.lock().unwrap().len(), 1);
        assert_eq!(*alerter.0.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_runs_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let source = ClockedSource::default();
        let sched = scheduler(
            source.clone(),
            CountingAlerter::default(),
            dir.path(),
            Schedule::Every(Duration::from_secs(60)),
        );

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stopper.cancel();
        });

        sched.run(shutdown).await.unwrap();
        // Passes at t=0, 60 and 120; shutdown lands during the third sleep.
        assert_eq!(source.listed_at.lock().unwrap().len(), 3);
    }
}
