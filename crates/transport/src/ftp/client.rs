//! Minimal async FTP client: login, CWD, passive-mode NLST and STOR.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

use crate::TransportError;
use crate::secret::Secret;

/// A server reply: three-digit code plus text (lines joined with `\n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    fn class(&self) -> u16 {
        self.code / 100
    }

    fn rejected(&self) -> TransportError {
        TransportError::Rejected(format!("{} {}", self.code, self.text))
    }

    /// Fails with [`TransportError::Rejected`] unless the reply is 2xx.
    fn expect_success(self) -> Result<Reply, TransportError> {
        if self.class() == 2 {
            Ok(self)
        } else {
            Err(self.rejected())
        }
    }
}

/// Control connection to an FTP server.
pub(crate) struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: IpAddr,
}

impl FtpClient {
    /// Connects and consumes the server greeting.
    pub(crate) async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port)).await?;
        let peer = stream.peer_addr()?.ip();
        let (reader, writer) = stream.into_split();

        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
            peer,
        };
        client.read_reply().await?.expect_success()?;
        Ok(client)
    }

    pub(crate) async fn login(&mut self, user: &str, password: &Secret) -> Result<(), TransportError> {
        let reply = self.command(&format!("USER {user}")).await?;
        match reply.code {
            230 => return Ok(()),
            331 | 332 => {}
            _ => return Err(reply.rejected()),
        }
        self.send_line(&format!("PASS {}", password.expose())).await?;
        self.read_reply().await?.expect_success()?;
        Ok(())
    }

    pub(crate) async fn cwd(&mut self, dir: &str) -> Result<(), TransportError> {
        self.command(&format!("CWD {dir}")).await?.expect_success()?;
        Ok(())
    }

    /// Switches to binary (image) transfers.
    pub(crate) async fn binary(&mut self) -> Result<(), TransportError> {
        self.command("TYPE I").await?.expect_success()?;
        Ok(())
    }

    /// Lists file names in the current directory.
    pub(crate) async fn nlst(&mut self) -> Result<Vec<String>, TransportError> {
        let mut data = self.passive().await?;
        let reply = self.command("NLST").await?;
        match reply.code {
            125 | 150 => {}
            // Some servers answer an empty directory with "no files".
            450 | 550 => return Ok(Vec::new()),
            _ => return Err(reply.rejected()),
        }

        let mut listing = Vec::new();
        data.read_to_end(&mut listing).await?;
        drop(data);
        self.read_reply().await?.expect_success()?;

        Ok(parse_listing(&listing))
    }

    /// Uploads `local` as `name`, returning the bytes sent.
    pub(crate) async fn stor(&mut self, name: &str, local: &Path) -> Result<u64, TransportError> {
        let mut file = tokio::fs::File::open(local).await?;
        let mut data = self.passive().await?;

        let reply = self.command(&format!("STOR {name}")).await?;
        if !matches!(reply.code, 125 | 150) {
            return Err(reply.rejected());
        }

        let sent = tokio::io::copy(&mut file, &mut data).await?;
        data.shutdown().await?;
        drop(data);
        self.read_reply().await?.expect_success()?;

        Ok(sent)
    }

    pub(crate) async fn quit(&mut self) -> Result<(), TransportError> {
        self.command("QUIT").await?;
        Ok(())
    }

    /// Enters passive mode and opens the data connection.
    ///
    /// The advertised address is ignored in favour of the control
    /// connection's peer; servers behind NAT often advertise a private IP.
    async fn passive(&mut self) -> Result<TcpStream, TransportError> {
        let reply = self.command("PASV").await?;
        if reply.code != 227 {
            return Err(reply.rejected());
        }
        let advertised = parse_pasv(&reply.text)?;
        let addr = SocketAddr::new(self.peer, advertised.port());
        trace!(%addr, %advertised, "opening data connection");
        Ok(TcpStream::connect(addr).await?)
    }

    async fn command(&mut self, cmd: &str) -> Result<Reply, TransportError> {
        trace!(cmd, "ftp >");
        self.send_line(cmd).await?;
        self.read_reply().await
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(TransportError::Protocol("control connection closed".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn read_reply(&mut self) -> Result<Reply, TransportError> {
        let first = self.read_line().await?;
        let (code, multiline, text) = parse_reply_line(&first)?;
        let mut text = text.to_string();

        if multiline {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_line().await?;
                if line == terminator.trim_end() {
                    break;
                }
                text.push('\n');
                if let Some(last) = line.strip_prefix(&terminator) {
                    text.push_str(last);
                    break;
                }
                text.push_str(&line);
            }
        }

        trace!(code, text = %text, "ftp <");
        Ok(Reply { code, text })
    }
}

/// Splits an NLST body into base names.
///
/// Names are decoded lossily so a Latin-1 entry cannot fail the listing.
fn parse_listing(raw: &[u8]) -> Vec<String> {
    raw.split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .map(|line| match line.rsplit_once('/') {
            Some((_, name)) => name.to_string(),
            None => line,
        })
        .collect()
}

/// Splits `"227 Entering..."` / `"220-Welcome"` into code, continuation flag and text.
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), TransportError> {
    let malformed = || TransportError::Protocol(format!("malformed reply: {line:?}"));

    let code = line
        .get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(malformed)?;
    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(malformed()),
    }
}

/// Extracts `h1,h2,h3,h4,p1,p2` from a 227 reply text.
pub(crate) fn parse_pasv(text: &str) -> Result<SocketAddr, TransportError> {
    let malformed = || TransportError::Protocol(format!("malformed PASV reply: {text:?}"));

    let start = text.find(|c: char| c.is_ascii_digit()).ok_or_else(malformed)?;
    let fields: Vec<u8> = text[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|n| n.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;

    let [a, b, c, d, p1, p2] = fields[..] else {
        return Err(malformed());
    };
    Ok(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
        u16::from(p1) << 8 | u16::from(p2),
    ))
}
