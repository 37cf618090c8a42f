//! Secure-copy delivery via an `scp` subprocess.
//!
//! With a password secret the command runs under `sshpass -e`, which reads
//! the password from `SSHPASS`; without one, scp runs in batch mode and
//! relies on key authentication. A process still running when the
//! timeout expires is killed.

use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::secret::{Secret, SecretProvider};
use crate::{DEFAULT_TIMEOUT, Session, Transport, TransportError, TransportFuture, bounded};

/// Secure-copy endpoint settings.
#[derive(Debug, Clone)]
pub struct ScpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Remote destination directory; empty means the login directory.
    pub remote_dir: String,
    pub timeout: Duration,
    /// Check for an existing remote file with `ssh ... test -e` before sending.
    pub verify_remote: bool,
    pub scp_program: String,
    pub ssh_program: String,
    pub sshpass_program: String,
}

impl ScpConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            remote_dir: String::new(),
            timeout: DEFAULT_TIMEOUT,
            verify_remote: false,
            scp_program: "scp".into(),
            ssh_program: "ssh".into(),
            sshpass_program: "sshpass".into(),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn remote_path(&self, name: &str) -> String {
        let dir = self.remote_dir.trim_end_matches('/');
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }
}

/// Delivers documents by running one `scp` per document.
pub struct ScpTransport {
    config: Arc<ScpConfig>,
    password: Option<Arc<dyn SecretProvider>>,
}

impl ScpTransport {
    /// Uses key authentication (`scp -B`).
    pub fn new(config: ScpConfig) -> Self {
        Self {
            config: Arc::new(config),
            password: None,
        }
    }

    /// Uses password authentication through `sshpass -e`.
    pub fn with_password(config: ScpConfig, password: Arc<dyn SecretProvider>) -> Self {
        Self {
            config: Arc::new(config),
            password: Some(password),
        }
    }
}

impl Transport for ScpTransport {
    fn describe(&self) -> String {
        format!(
            "scp://{}:{}/{}",
            self.config.destination(),
            self.config.port,
            self.config.remote_dir
        )
    }

    fn connect(&self) -> TransportFuture<'_, Box<dyn Session>> {
        Box::pin(async move {
            let password = self.password.as_ref().map(|p| p.secret()).transpose()?;
            Ok(Box::new(ScpSession {
                config: Arc::clone(&self.config),
                password,
            }) as Box<dyn Session>)
        })
    }
}

struct ScpSession {
    config: Arc<ScpConfig>,
    password: Option<Secret>,
}

impl ScpSession {
    fn command(&self, program: &str) -> Command {
        let mut cmd = match &self.password {
            Some(secret) => {
                let mut cmd = Command::new(&self.config.sshpass_program);
                cmd.arg("-e").arg(program).env("SSHPASS", secret.expose());
                cmd
            }
            None => Command::new(program),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<Output, TransportError> {
        bounded(self.config.timeout, async move { Ok::<_, TransportError>(cmd.output().await?) }).await
    }

    async fn upload(&self, local: &Path, name: &str) -> Result<u64, TransportError> {
        let size = tokio::fs::metadata(local).await?.len();
        let cfg = &self.config;

        let mut cmd = self.command(&cfg.scp_program);
        if self.password.is_none() {
            cmd.arg("-B");
        }
        cmd.arg("-P")
            .arg(cfg.port.to_string())
            .arg(local)
            .arg(format!("{}:{}", cfg.destination(), cfg.remote_path(name)));

        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(TransportError::Rejected(format!(
                "scp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(doc = name, bytes = size, host = %cfg.host, "copied to remote");
        Ok(size)
    }

    async fn remote_has(&self, name: &str) -> Result<bool, TransportError> {
        if !self.config.verify_remote {
            return Ok(false);
        }
        let cfg = &self.config;

        let mut cmd = self.command(&cfg.ssh_program);
        cmd.arg("-p").arg(cfg.port.to_string());
        if self.password.is_none() {
            cmd.arg("-o").arg("BatchMode=yes");
        }
        cmd.arg(cfg.destination())
            .arg(format!("test -e {}", shell_quote(&cfg.remote_path(name))));

        let output = self.run(cmd).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(TransportError::Rejected(format!(
                "remote check exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

impl Session for ScpSession {
    fn detects_duplicates(&self) -> bool {
        self.config.verify_remote
    }

    fn already_delivered<'a>(&'a mut self, name: &'a str) -> TransportFuture<'a, bool> {
        Box::pin(self.remote_has(name))
    }

    fn send<'a>(&'a mut self, local: &'a Path, name: &'a str) -> TransportFuture<'a, u64> {
        Box::pin(self.upload(local, name))
    }

    fn close(self: Box<Self>) -> TransportFuture<'static, ()> {
        debug!("scp session closed");
        Box::pin(async { Ok(()) })
    }
}

/// Single-quotes `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
