//! Whole-file access to the remote server.

pub mod ftp;

use crate::commands::config::ConnectionSettings;
use crate::error::Result;

pub use ftp::{FtpConnector, FtpSession};

/// An open session on the remote file server.
#[allow(async_fn_in_trait)]
pub trait RemoteFiles {
    /// Download the whole file at `path`.
    async fn fetch(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Upload `data`, replacing the file at `path`.
    async fn store(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// No-op round trip used to check the session is still alive.
    async fn probe(&mut self) -> Result<()>;

    /// Close the session. Failures are ignored.
    async fn close(&mut self) {}
}

/// Opens sessions from connection settings.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: RemoteFiles;

    async fn connect(&self, settings: &ConnectionSettings) -> Result<Self::Session>;
}
