//! Failure reporting.

use docrelay_alert::{Alert, Alerter};
use tracing::{error, warn};

use crate::audit::{AuditLog, ErrorLogEntry};
use crate::error::PassError;

/// Default alert subject.
pub const DEFAULT_SUBJECT: &str = "Document Transfer Alert";

/// Default first line of the alert body.
pub const DEFAULT_BODY: &str = "The document transfer process has stopped.";

/// Turns a failed pass into one error-log line and one alert.
///
/// Reporting never fails: a broken alert channel is logged locally and
/// otherwise ignored.
pub struct FailureReporter {
    alerter: Box<dyn Alerter>,
    audit: AuditLog,
    subject: String,
    body: String,
    origin: Option<String>,
}

impl FailureReporter {
    pub fn new(alerter: Box<dyn Alerter>, audit: AuditLog) -> Self {
        Self {
            alerter,
            audit,
            subject: DEFAULT_SUBJECT.into(),
            body: DEFAULT_BODY.into(),
            origin: None,
        }
    }

    pub fn with_message(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.subject = subject.into();
        self.body = body.into();
        self
    }

    /// Names the reporting machine in alert bodies.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn alert_for(&self, err: &PassError) -> Alert {
        let mut body = format!("{}\n\nCause: {err}", self.body);
        if let Some(origin) = &self.origin {
            body.push_str(&format!("\nHost: {origin}"));
        }
        Alert {
            subject: self.subject.clone(),
            body,
        }
    }

    pub async fn report(&self, err: &PassError) {
        error!(
            kind = err.kind(),
            doc = err.document().unwrap_or("-"),
            timeout = err.is_timeout(),
            error = %err,
            "pass aborted"
        );

        self.log_error(format!("Unexpected error: {err}")).await;

        if let Err(e) = self.alerter.publish(&self.alert_for(err)).await {
            warn!(error = %e, "alert delivery failed");
            self.log_error(format!("Alert delivery failed: {e}")).await;
        }
    }

    async fn log_error(&self, message: String) {
        if let Err(e) = self.audit.record_error(&ErrorLogEntry::now(message)).await {
            warn!(error = %e, path = %self.audit.error_path().display(), "failed to write error log");
        }
    }
}
