//! Delivery transports.
//!
//! A [`Transport`] opens one [`Session`] per reconciliation pass; the
//! session delivers documents one at a time and answers whether a
//! document is already present on the remote side. Every remote
//! operation is bounded by the transport's timeout, and nothing is
//! retried here: the next scheduled pass is the retry.

mod error;
mod ftp;
mod scp;
mod secret;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

pub use error::TransportError;
pub use ftp::{FtpConfig, FtpTransport, Reply};
pub use scp::{ScpConfig, ScpTransport};
pub use secret::{EnvSecret, Secret, SecretProvider, StaticSecret};

/// Default bound on a single remote operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A boxed future returned by transport operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Factory for per-pass delivery sessions.
pub trait Transport: Send + Sync {
    /// Human-readable endpoint, used in logs and alerts.
    fn describe(&self) -> String;

    /// Opens a session (connects and authenticates where applicable).
    fn connect(&self) -> TransportFuture<'_, Box<dyn Session>>;
}

/// An open connection to the delivery endpoint.
pub trait Session: Send {
    /// Whether [`Session::already_delivered`] reflects the remote side.
    ///
    /// When false, `already_delivered` always answers `false`.
    fn detects_duplicates(&self) -> bool;

    /// Returns true if a file named `name` is already on the remote side.
    fn already_delivered<'a>(&'a mut self, name: &'a str) -> TransportFuture<'a, bool>;

    /// Delivers the local file as `name`, returning the bytes sent.
    fn send<'a>(&'a mut self, local: &'a Path, name: &'a str) -> TransportFuture<'a, u64>;

    /// Closes the session.
    fn close(self: Box<Self>) -> TransportFuture<'static, ()>;
}

/// Runs `fut` with a deadline, mapping expiry to [`TransportError::Timeout`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
