//! Operator alerts.
//!
//! An [`Alerter`] publishes a short subject/body notification when a
//! reconciliation pass fails. Alerting is best effort: callers log and
//! swallow [`AlertError`].

mod topic;

use std::future::Future;
use std::pin::Pin;

pub use topic::TopicAlerter;

/// A boxed future returned by alerters.
pub type AlertFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>>;

/// Errors produced while publishing an alert.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("alert endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },
}

/// A notification for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

/// Publishes alerts to some channel.
pub trait Alerter: Send + Sync {
    fn publish<'a>(&'a self, alert: &'a Alert) -> AlertFuture<'a>;
}

/// Writes alerts to the tracing log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn publish<'a>(&'a self, alert: &'a Alert) -> AlertFuture<'a> {
        Box::pin(async move {
            tracing::error!(subject = %alert.subject, "{}", alert.body);
            Ok(())
        })
    }
}
