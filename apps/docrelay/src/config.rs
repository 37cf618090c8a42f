//! docrelay configuration.
//!
//! Configuration is stored as TOML. The path is taken from the first
//! command-line argument, then `DOCRELAY_CONFIG`, then:
//! - Linux: `~/.config/docrelay/docrelay.toml`
//! - Windows: `%APPDATA%/docrelay/docrelay.toml`
//!
//! Credentials never live in this file; `password_env` names the
//! environment variable holding them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "DOCRELAY_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One pass, then exit.
    Once,
    /// Poll forever at `interval_secs`.
    Repeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Seconds between passes in `repeat` mode.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    pub source: SourceConfig,

    pub transport: TransportConfig,

    #[serde(default)]
    pub alert: AlertConfig,

    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A shared directory; delivered files get the `processed-` prefix.
    Folder {
        path: PathBuf,
        #[serde(default = "default_suffix")]
        suffix: String,
        #[serde(default = "default_prefix")]
        processed_prefix: String,
    },
    /// A locally mounted bucket; delivered objects get the `.processed` suffix.
    Bucket {
        path: PathBuf,
        staging_dir: PathBuf,
        #[serde(default = "default_suffix")]
        suffix: String,
        #[serde(default = "default_marker_suffix")]
        processed_suffix: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Ftp {
        host: String,
        #[serde(default = "default_ftp_port")]
        port: u16,
        user: String,
        #[serde(default)]
        remote_dir: String,
        #[serde(default = "default_password_env")]
        password_env: String,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    Scp {
        host: String,
        #[serde(default = "default_scp_port")]
        port: u16,
        user: String,
        #[serde(default)]
        remote_dir: String,
        /// Unset means key authentication.
        #[serde(default)]
        password_env: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
        #[serde(default)]
        verify_remote: bool,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertConfig {
    /// Alerts only go to the process log.
    #[default]
    Log,
    /// Publish to an HTTP topic endpoint.
    Topic {
        endpoint: String,
        topic: String,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_success_log")]
    pub success: PathBuf,
    #[serde(default = "default_error_log")]
    pub error: PathBuf,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            success: default_success_log(),
            error: default_error_log(),
        }
    }
}

fn default_mode() -> Mode {
    Mode::Repeat
}

fn default_interval() -> u64 {
    60
}

fn default_suffix() -> String {
    docrelay_source::DEFAULT_SUFFIX.into()
}

fn default_prefix() -> String {
    docrelay_source::FOLDER_PROCESSED_PREFIX.into()
}

fn default_marker_suffix() -> String {
    docrelay_source::BUCKET_PROCESSED_SUFFIX.into()
}

fn default_ftp_port() -> u16 {
    21
}

fn default_scp_port() -> u16 {
    22
}

fn default_password_env() -> String {
    "DOCRELAY_PASSWORD".into()
}

fn default_timeout() -> u64 {
    60
}

fn default_success_log() -> PathBuf {
    docrelay_reconcile::audit::DEFAULT_SUCCESS_LOG.into()
}

fn default_error_log() -> PathBuf {
    docrelay_reconcile::audit::DEFAULT_ERROR_LOG.into()
}

impl Config {
    /// Loads and validates configuration from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == Mode::Repeat && self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }

        match &self.source {
            SourceConfig::Folder {
                suffix,
                processed_prefix,
                ..
            } => {
                if suffix.is_empty() || processed_prefix.is_empty() {
                    bail!("folder source needs a non-empty suffix and processed_prefix");
                }
            }
            SourceConfig::Bucket {
                path,
                staging_dir,
                suffix,
                processed_suffix,
            } => {
                if suffix.is_empty() || processed_suffix.is_empty() {
                    bail!("bucket source needs a non-empty suffix and processed_suffix");
                }
                // Staging into the bucket would stage each object onto itself.
                if staging_dir == path {
                    bail!("staging_dir must differ from the bucket path");
                }
            }
        }

        let (host, user, timeout) = match &self.transport {
            TransportConfig::Ftp {
                host,
                user,
                timeout_secs,
                ..
            }
            | TransportConfig::Scp {
                host,
                user,
                timeout_secs,
                ..
            } => (host, user, *timeout_secs),
        };
        if host.trim().is_empty() {
            bail!("transport host must not be empty");
        }
        if user.trim().is_empty() {
            bail!("transport user must not be empty");
        }
        if timeout == 0 {
            bail!("transport timeout_secs must be greater than zero");
        }

        if let AlertConfig::Topic { endpoint, topic, .. } = &self.alert {
            if endpoint.trim().is_empty() || topic.trim().is_empty() {
                bail!("topic alerts need both endpoint and topic");
            }
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Picks the configuration file path.
pub fn resolve_path(arg: Option<OsString>) -> anyhow::Result<PathBuf> {
    if let Some(arg) = arg {
        return Ok(PathBuf::from(arg));
    }
    if let Some(env) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(env));
    }
    default_config_path()
}

/// Returns the platform-specific configuration file path.
fn default_config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("docrelay").join("docrelay.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("docrelay")
            .join("docrelay.toml"))
    }
}
