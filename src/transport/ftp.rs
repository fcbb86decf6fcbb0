//! Minimal FTP client: login, binary type, passive-mode RETR/STOR and NOOP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{Connector, RemoteFiles};
use crate::commands::config::ConnectionSettings;
use crate::error::{ManagerError, Result};

/// A parsed server reply: three-digit code plus the text of all its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    fn is(&self, codes: &[u16]) -> bool {
        codes.contains(&self.code)
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FtpConnector;

impl Connector for FtpConnector {
    type Session = FtpSession;

    async fn connect(&self, settings: &ConnectionSettings) -> Result<FtpSession> {
        FtpSession::login(settings).await
    }
}

pub struct FtpSession {
    control: BufReader<TcpStream>,
    peer: IpAddr,
}

impl FtpSession {
    /// Connect, authenticate and switch to binary transfers.
    pub async fn login(settings: &ConnectionSettings) -> Result<Self> {
        let stream = TcpStream::connect((settings.host.as_str(), settings.port))
            .await
            .map_err(|e| {
                ManagerError::Connection(format!(
                    "cannot reach {}:{}: {e}",
                    settings.host, settings.port
                ))
            })?;
        let peer = stream
            .peer_addr()
            .map(|a| a.ip())
            .map_err(|e| ManagerError::Connection(e.to_string()))?;

        let mut session = Self {
            control: BufReader::new(stream),
            peer,
        };

        let greeting = session.read_reply().await.map_err(as_connection)?;
        if !greeting.is(&[220]) {
            return Err(ManagerError::Connection(format!("unexpected greeting: {greeting}")));
        }

        let reply = session
            .command(&format!("USER {}", settings.user))
            .await
            .map_err(as_connection)?;
        let reply = if reply.is(&[331, 332]) {
            session
                .command(&format!("PASS {}", settings.password))
                .await
                .map_err(as_connection)?
        } else {
            reply
        };
        if !reply.is(&[230, 202]) {
            return Err(ManagerError::Connection(format!("login rejected: {reply}")));
        }

        let reply = session.command("TYPE I").await.map_err(as_connection)?;
        if !reply.is(&[200]) {
            return Err(ManagerError::Connection(format!(
                "server refused binary mode: {reply}"
            )));
        }

        Ok(session)
    }

    async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        let n = self.control.read_line(&mut line).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "control connection closed",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read one reply, following `123-` continuation lines to the closing
    /// `123 ` line.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let first = self.read_line().await?;
        let code = parse_code(&first)
            .ok_or_else(|| ManagerError::Custom(format!("malformed reply: {first}")))?;
        let mut text = first.get(4..).unwrap_or_default().to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_line().await?;
                if line.starts_with(&terminator) || line == code.to_string() {
                    text.push('\n');
                    text.push_str(line.get(4..).unwrap_or_default());
                    break;
                }
                text.push('\n');
                text.push_str(&line);
            }
        }

        Ok(Reply { code, text })
    }

    pub async fn command(&mut self, command: &str) -> Result<Reply> {
        let stream = self.control.get_mut();
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        self.read_reply().await
    }

    /// Enter passive mode and open the data connection. Only the port of
    /// the 227 reply is used; the host is always the control peer.
    async fn open_data(&mut self) -> Result<TcpStream> {
        let reply = self.command("PASV").await?;
        if !reply.is(&[227]) {
            return Err(ManagerError::Custom(format!("passive mode refused: {reply}")));
        }
        let advertised = parse_pasv(&reply.text)
            .ok_or_else(|| ManagerError::Custom(format!("malformed PASV reply: {reply}")))?;
        let addr = SocketAddr::new(self.peer, advertised.port());
        Ok(TcpStream::connect(addr).await?)
    }

    async fn transfer_done(&mut self, path: &str) -> Result<()> {
        let reply = self.read_reply().await?;
        if reply.is(&[226, 250]) {
            Ok(())
        } else {
            Err(transfer(path, reply.to_string()))
        }
    }
}

impl RemoteFiles for FtpSession {
    async fn fetch(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut data = self.open_data().await.map_err(|e| transfer(path, e))?;
        let reply = self
            .command(&format!("RETR {path}"))
            .await
            .map_err(|e| transfer(path, e))?;
        if !reply.is(&[125, 150]) {
            return Err(transfer(path, reply));
        }

        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .await
            .map_err(|e| transfer(path, e))?;
        drop(data);

        self.transfer_done(path).await?;
        Ok(bytes)
    }

    async fn store(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut data = self.open_data().await.map_err(|e| transfer(path, e))?;
        let reply = self
            .command(&format!("STOR {path}"))
            .await
            .map_err(|e| transfer(path, e))?;
        if !reply.is(&[125, 150]) {
            return Err(transfer(path, reply));
        }

        data.write_all(bytes).await.map_err(|e| transfer(path, e))?;
        data.shutdown().await.map_err(|e| transfer(path, e))?;
        drop(data);

        self.transfer_done(path).await
    }

    async fn probe(&mut self) -> Result<()> {
        let reply = self.command("NOOP").await?;
        if reply.is(&[200]) {
            Ok(())
        } else {
            Err(ManagerError::Connection(format!("liveness probe failed: {reply}")))
        }
    }

    async fn close(&mut self) {
        let _ = self.command("QUIT").await;
    }
}

fn transfer(path: &str, reason: impl std::fmt::Display) -> ManagerError {
    ManagerError::Transfer {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn as_connection(err: ManagerError) -> ManagerError {
    match err {
        ManagerError::Connection(_) => err,
        other => ManagerError::Connection(other.to_string()),
    }
}

fn parse_code(line: &str) -> Option<u16> {
    let code = line.get(..3)?;
    if code.bytes().all(|b| b.is_ascii_digit()) {
        code.parse().ok()
    } else {
        None
    }
}

/// Extract `h1,h2,h3,h4,p1,p2` from a 227 reply, with or without parens.
pub fn parse_pasv(text: &str) -> Option<SocketAddr> {
    text.split(|c: char| !c.is_ascii_digit() && c != ',')
        .find_map(|chunk| {
            let parts: Vec<u8> = chunk
                .split(',')
                .map(|p| p.parse::<u8>())
                .collect::<std::result::Result<_, _>>()
                .ok()?;
            if parts.len() != 6 {
                return None;
            }
            let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
            let port = (u16::from(parts[4]) << 8) | u16::from(parts[5]);
            Some(SocketAddr::new(IpAddr::V4(ip), port))
        })
}
