//! FTP client: control connection, request engine, and facade verbs.

mod connection;
mod engine;
mod metadata;
mod navigation;
mod session;
mod state;
mod transfer;

use crate::capabilities::Capabilities;
use crate::config::FtpConfig;
use crate::queue::RequestQueue;
use connection::ControlConnection;
use state::{ConnectionState, TransferType};
use std::sync::Arc;
use tracing::debug;

pub use transfer::UploadSource;

/// Async FTP client with explicit-TLS, FEAT capability discovery, MODE Z
/// compression, and PASV-only passive data transfers.
///
/// # Example
///
/// ```no_run
/// use ftp_rs::FtpConfig;
/// use ftp_rs::FtpClient;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FtpConfig::ftps("ftp.example.com", "user", "pass");
/// let mut client = FtpClient::connect(Arc::new(config)).await?;
/// client.login().await?;
///
/// let files = client.list(None, false).await?;
/// println!("{} entries", files.len());
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct FtpClient {
    control: ControlConnection,
    state: ConnectionState,
    config: Arc<FtpConfig>,
    capabilities: Capabilities,
    transfer_type: TransferType,
    queue: RequestQueue,
    is_broken: bool,
}

impl FtpClient {
    /// Check if this connection is broken and should be discarded
    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Mark this connection as broken
    pub(super) fn mark_broken(&mut self) {
        self.is_broken = true;
    }

    /// Check if the client has completed login
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, ConnectionState::Authenticated)
    }

    /// Capabilities discovered via FEAT during connect
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl Drop for FtpClient {
    fn drop(&mut self) {
        debug!("FtpClient dropped");
    }
}
