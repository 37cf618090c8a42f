//! Wires configuration into a running scheduler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use docrelay_alert::{Alerter, LogAlerter, TopicAlerter};
use docrelay_reconcile::{AuditLog, FailureReporter, Reconciler, Schedule, Scheduler, report};
use docrelay_source::{
    BucketSource, CandidateFilter, DirBucket, DocumentSource, FolderSource, Marker,
};
use docrelay_transport::{
    EnvSecret, FtpConfig, FtpTransport, ScpConfig, ScpTransport, SecretProvider, Transport,
};
use tokio_util::sync::CancellationToken;

use crate::config::{AlertConfig, Config, Mode, SourceConfig, TransportConfig};

/// Runs until the schedule finishes or ctrl-c is received.
///
/// A failed pass in `once` mode becomes an error so the process exits
/// non-zero; the failure has already been reported by then.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let scheduler = build_scheduler(&config)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            signal.cancel();
        }
    });

    scheduler
        .run(shutdown)
        .await
        .context("transfer pass failed")
}

pub fn build_scheduler(config: &Config) -> anyhow::Result<Scheduler> {
    let audit = AuditLog::new(&config.logs.success, &config.logs.error);
    let reconciler = Reconciler::new(
        build_source(&config.source),
        build_transport(&config.transport),
        audit.clone(),
    );

    let mut reporter = FailureReporter::new(build_alerter(&config.alert)?, audit);
    if let AlertConfig::Topic { subject, body, .. } = &config.alert {
        if subject.is_some() || body.is_some() {
            reporter = reporter.with_message(
                subject.as_deref().unwrap_or(report::DEFAULT_SUBJECT),
                body.as_deref().unwrap_or(report::DEFAULT_BODY),
            );
        }
    }
    if let Some(host) = hostname::get().ok().and_then(|h| h.into_string().ok()) {
        reporter = reporter.with_origin(host);
    }

    let schedule = match config.mode {
        Mode::Once => Schedule::Once,
        Mode::Repeat => Schedule::Every(config.interval()),
    };

    Ok(Scheduler::new(reconciler, reporter, schedule))
}

fn build_source(config: &SourceConfig) -> Box<dyn DocumentSource> {
    match config {
        SourceConfig::Folder {
            path,
            suffix,
            processed_prefix,
        } => {
            let filter = CandidateFilter::new(suffix, Marker::Prefix(processed_prefix.clone()));
            Box::new(FolderSource::with_filter(path, filter))
        }
        SourceConfig::Bucket {
            path,
            staging_dir,
            suffix,
            processed_suffix,
        } => {
            let filter = CandidateFilter::new(suffix, Marker::Suffix(processed_suffix.clone()));
            Box::new(BucketSource::with_filter(
                DirBucket::new(path),
                staging_dir,
                filter,
            ))
        }
    }
}

fn build_transport(config: &TransportConfig) -> Box<dyn Transport> {
    match config {
        TransportConfig::Ftp {
            host,
            port,
            user,
            remote_dir,
            password_env,
            timeout_secs,
        } => {
            let mut ftp = FtpConfig::new(host, user);
            ftp.port = *port;
            ftp.remote_dir = remote_dir.clone();
            ftp.timeout = Duration::from_secs(*timeout_secs);
            let secret: Arc<dyn SecretProvider> = Arc::new(EnvSecret::new(password_env));
            Box::new(FtpTransport::new(ftp, secret))
        }
        TransportConfig::Scp {
            host,
            port,
            user,
            remote_dir,
            password_env,
            timeout_secs,
            verify_remote,
        } => {
            let mut scp = ScpConfig::new(host, user);
            scp.port = *port;
            scp.remote_dir = remote_dir.clone();
            scp.timeout = Duration::from_secs(*timeout_secs);
            scp.verify_remote = *verify_remote;
            match password_env {
                Some(var) => {
                    let secret: Arc<dyn SecretProvider> = Arc::new(EnvSecret::new(var));
                    Box::new(ScpTransport::with_password(scp, secret))
                }
                None => Box::new(ScpTransport::new(scp)),
            }
        }
    }
}

fn build_alerter(config: &AlertConfig) -> anyhow::Result<Box<dyn Alerter>> {
    Ok(match config {
        AlertConfig::Log => Box::new(LogAlerter),
        AlertConfig::Topic {
            endpoint, topic, ..
        } => Box::new(
            TopicAlerter::new(endpoint, topic).context("building topic alerter")?,
        ),
    })
}
