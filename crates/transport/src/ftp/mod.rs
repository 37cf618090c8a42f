//! FTP delivery.
//!
//! One control connection per pass: login, change to the remote
//! directory, then `STOR` each document. Duplicate detection compares
//! document names against an `NLST` of the remote directory.

mod client;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::secret::SecretProvider;
use crate::{DEFAULT_TIMEOUT, Session, Transport, TransportError, TransportFuture, bounded};

use client::FtpClient;
pub use client::Reply;

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// FTP endpoint settings.
#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Directory to `CWD` into after login; empty keeps the login directory.
    pub remote_dir: String,
    pub timeout: Duration,
}

impl FtpConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            user: user.into(),
            remote_dir: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Delivers documents with `STOR` over a passive-mode FTP session.
pub struct FtpTransport {
    config: FtpConfig,
    secret: Arc<dyn SecretProvider>,
}

impl FtpTransport {
    pub fn new(config: FtpConfig, secret: Arc<dyn SecretProvider>) -> Self {
        Self { config, secret }
    }

    async fn open(&self) -> Result<Box<dyn Session>, TransportError> {
        let password = self.secret.secret()?;
        let cfg = &self.config;

        let client = bounded(cfg.timeout, async {
            let mut client = FtpClient::connect(&cfg.host, cfg.port).await?;
            client.login(&cfg.user, &password).await?;
            if !cfg.remote_dir.is_empty() {
                client.cwd(&cfg.remote_dir).await?;
            }
            client.binary().await?;
            Ok::<_, TransportError>(client)
        })
        .await?;

        info!(host = %cfg.host, port = cfg.port, dir = %cfg.remote_dir, "FTP session opened");
        Ok(Box::new(FtpSession {
            client,
            timeout: cfg.timeout,
            listing: None,
        }))
    }
}

impl Transport for FtpTransport {
    fn describe(&self) -> String {
        format!(
            "ftp://{}@{}:{}/{}",
            self.config.user, self.config.host, self.config.port, self.config.remote_dir
        )
    }

    fn connect(&self) -> TransportFuture<'_, Box<dyn Session>> {
        Box::pin(self.open())
    }
}

struct FtpSession {
    client: FtpClient,
    timeout: Duration,
    /// Remote names, fetched on first use and kept current after each upload.
    listing: Option<HashSet<String>>,
}

impl FtpSession {
    async fn remote_has(&mut self, name: &str) -> Result<bool, TransportError> {
        if self.listing.is_none() {
            let names = bounded(self.timeout, self.client.nlst()).await?;
            debug!(entries = names.len(), "fetched remote listing");
            self.listing = Some(names.into_iter().collect());
        }
        Ok(self.listing.as_ref().is_some_and(|l| l.contains(name)))
    }

    async fn upload(&mut self, local: &Path, name: &str) -> Result<u64, TransportError> {
        let sent = bounded(self.timeout, self.client.stor(name, local)).await?;
        if let Some(listing) = self.listing.as_mut() {
            listing.insert(name.to_string());
        }
        Ok(sent)
    }
}

impl Session for FtpSession {
    fn detects_duplicates(&self) -> bool {
        true
    }

    fn already_delivered<'a>(&'a mut self, name: &'a str) -> TransportFuture<'a, bool> {
        Box::pin(self.remote_has(name))
    }

    fn send<'a>(&'a mut self, local: &'a Path, name: &'a str) -> TransportFuture<'a, u64> {
        Box::pin(self.upload(local, name))
    }

    fn close(mut self: Box<Self>) -> TransportFuture<'static, ()> {
        Box::pin(async move {
            if let Err(e) = bounded(self.timeout, self.client.quit()).await {
                warn!(error = %e, "FTP QUIT failed");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::{Secret, StaticSecret};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

    const PASSWORD: &str = "s3cret";

    /// In-process FTP server speaking just enough of the protocol.
    struct FakeServer {
        addr: SocketAddr,
        files: Files,
        commands: Arc<Mutex<Vec<String>>>,
    }

    async fn spawn_server(existing: &[&str]) -> FakeServer {
        spawn_server_with_listing(existing, b"").await
    }

    /// `extra_listing` is appended verbatim to every NLST body.
    async fn spawn_server_with_listing(existing: &[&str], extra_listing: &'static [u8]) -> FakeServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let files: Files = Arc::new(Mutex::new(
            existing
                .iter()
                .map(|n| (n.to_string(), b"old".to_vec()))
                .collect(),
        ));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let (f, c) = (Arc::clone(&files), Arc::clone(&commands));
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&f), Arc::clone(&c), extra_listing));
            }
        });

        FakeServer {
            addr,
            files,
            commands,
        }
    }

    async fn serve(
        stream: TcpStream,
        files: Files,
        commands: Arc<Mutex<Vec<String>>>,
        extra_listing: &'static [u8],
    ) {
        let (reader, mut w) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let mut data: Option<TcpListener> = None;

        w.write_all(b"220-Welcome\r\n220 ready\r\n").await.unwrap();

        while let Ok(Some(line)) = lines.next_line().await {
            commands.lock().unwrap().push(line.clone());
            let (cmd, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            let reply: String = match cmd {
                "USER" => "331 password required".into(),
                "PASS" if arg == PASSWORD => "230 logged in".into(),
                "PASS" => "530 login incorrect".into(),
                "CWD" if arg == "missing" => "550 no such directory".into(),
                "CWD" => "250 ok".into(),
                "TYPE" => "200 binary".into(),
                "PASV" => {
                    let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
                    let port = l.local_addr().unwrap().port();
                    data = Some(l);
                    format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port >> 8,
                        port & 0xff
                    )
                }
                "NLST" => {
                    w.write_all(b"150 listing\r\n").await.unwrap();
                    let (mut conn, _) = data.take().unwrap().accept().await.unwrap();
                    let names: Vec<String> = files.lock().unwrap().keys().cloned().collect();
                    let body: String = names.iter().map(|n| format!("{n}\r\n")).collect();
                    conn.write_all(body.as_bytes()).await.unwrap();
                    conn.write_all(extra_listing).await.unwrap();
                    drop(conn);
                    // Multi-line completion ending in a bare code.
                    "226-Transfer complete\r\n226".into()
                }
                "STOR" if arg.starts_with("reject") => "553 not allowed".into(),
                "STOR" => {
                    w.write_all(b"150 send it\r\n").await.unwrap();
                    let (mut conn, _) = data.take().unwrap().accept().await.unwrap();
                    let mut buf = Vec::new();
                    conn.read_to_end(&mut buf).await.unwrap();
                    files.lock().unwrap().insert(arg.to_string(), buf);
                    "226 stored".into()
                }
                "QUIT" => {
                    w.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                }
                _ => "502 not implemented".into(),
            };
            w.write_all(format!("{reply}\r\n").as_bytes()).await.unwrap();
        }
    }

    fn transport(addr: SocketAddr, password: &str, dir: &str) -> FtpTransport {
        let config = FtpConfig {
            port: addr.port(),
            remote_dir: dir.into(),
            timeout: Duration::from_secs(5),
            ..FtpConfig::new("127.0.0.1", "hosted")
        };
        FtpTransport::new(config, Arc::new(StaticSecret(Secret::new(password))))
    }

    #[tokio::test]
    async fn uploads_file_and_tracks_listing() {
        let server = spawn_server(&["old.pdf"]).await;
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.pdf");
        std::fs::write(&local, b"%PDF-1.4 body").unwrap();

        let t = transport(server.addr, PASSWORD, "illiad/pdf");
        let mut session = t.connect().await.unwrap();
        assert!(session.detects_duplicates());

        assert!(session.already_delivered("old.pdf").await.unwrap());
        assert!(!session.already_delivered("a.pdf").await.unwrap());

        let sent = session.send(&local, "a.pdf").await.unwrap();
        assert_eq!(sent, 13);
        assert!(session.already_delivered("a.pdf").await.unwrap());
        session.close().await.unwrap();

        assert_eq!(
            server.files.lock().unwrap().get("a.pdf").unwrap(),
            b"%PDF-1.4 body"
        );
        let commands = server.commands.lock().unwrap();
        assert!(commands.contains(&"CWD illiad/pdf".to_string()));
        assert!(commands.contains(&"TYPE I".to_string()));
        assert_eq!(commands.iter().filter(|c| *c == "NLST").count(), 1);
    }

    #[tokio::test]
    async fn non_utf8_remote_name_does_not_break_listing() {
        let server = spawn_server_with_listing(&["other.pdf"], b"caf\xe9.pdf\r\n").await;

        let t = transport(server.addr, PASSWORD, "");
        let mut session = t.connect().await.unwrap();

        assert!(!session.already_delivered("a.pdf").await.unwrap());
        assert!(session.already_delivered("other.pdf").await.unwrap());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let server = spawn_server(&[]).await;
        let t = transport(server.addr, "wrong", "");
        let err = t.connect().await.err().unwrap();
        assert!(matches!(err, TransportError::Rejected(ref m) if m.starts_with("530")));
    }

    #[tokio::test]
    async fn missing_remote_dir_is_rejected() {
        let server = spawn_server(&[]).await;
        let t = transport(server.addr, PASSWORD, "missing");
        let err = t.connect().await.err().unwrap();
        assert_eq!(err.kind(), "rejected");
    }

    #[tokio::test]
    async fn refused_upload_is_rejected() {
        let server = spawn_server(&[]).await;
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("reject.pdf");
        std::fs::write(&local, b"x").unwrap();

        let t = transport(server.addr, PASSWORD, "");
        let mut session = t.connect().await.unwrap();
        let err = session.send(&local, "reject.pdf").await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(ref m) if m.starts_with("553")));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without a greeting.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = FtpConfig {
            port: addr.port(),
            timeout: Duration::from_millis(200),
            ..FtpConfig::new("127.0.0.1", "hosted")
        };
        let t = FtpTransport::new(config, Arc::new(StaticSecret(Secret::new(PASSWORD))));
        let err = t.connect().await.err().unwrap();
        assert!(err.is_timeout());
    }

    #[test]
    fn describe_includes_endpoint() {
        let t = transport("127.0.0.1:2121".parse().unwrap(), PASSWORD, "pdf");
        assert_eq!(t.describe(), "ftp://hosted@127.0.0.1:2121/pdf");
    }
}
