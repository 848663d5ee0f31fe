//! Session Controller: connect sequence, login, disconnect, reset.
//!
//! Connect order (RFC 959 plus the explicit-FTPS extensions): TCP connect →
//! greeting → FEAT → (if configured) AUTH TLS / PBSZ 0 / PROT P → login is a
//! separate step the caller invokes explicitly so that an anonymous
//! connection can be probed (capabilities, `SYST`) before committing to a
//! login.

use super::connection::ControlConnection;
use super::state::{ConnectionState, TransferType};
use super::FtpClient;
use crate::capabilities::Capabilities;
use crate::commands;
use crate::config::FtpConfig;
use crate::error::{FtpError, Result};
use crate::queue::RequestQueue;
use std::sync::Arc;
use tracing::debug;

impl FtpClient {
    /// Connect to the server, negotiate TLS if `config.tls`, and discover
    /// FEAT capabilities. Does not log in — call [`login`](Self::login) next.
    pub async fn connect(config: Arc<FtpConfig>) -> Result<Self> {
        let (mut control, _greeting) = ControlConnection::connect(&config).await?;

        let feat = control.command(commands::feat()).await?;
        let capabilities = if feat.is_success() {
            Capabilities::parse(&feat)
        } else {
            debug!("server does not support FEAT: {}", feat.text());
            Capabilities::new()
        };
        let queue = RequestQueue::new(config.keep_finished_queue, config.finished_history_capacity);

        Ok(Self {
            control,
            state: ConnectionState::Ready,
            config,
            capabilities,
            transfer_type: TransferType::Binary,
            queue,
            is_broken: false,
        })
    }

    /// USER/PASS login, then force binary (`TYPE I`) transfer mode.
    pub async fn login(&mut self) -> Result<()> {
        let user_resp = self.control.command(&commands::user(&self.config.username)).await?;
        if user_resp.code == 230 {
            // some servers accept USER alone (no password required)
        } else if user_resp.code != 331 {
            return Err(FtpError::LoginFailed(format!(
                "USER rejected ({}): {}",
                user_resp.code,
                user_resp.text()
            )));
        } else {
            let pass_resp = self.control.command(&commands::pass(&self.config.password)).await?;
            if pass_resp.code != 230 {
                return Err(FtpError::LoginFailed(format!(
                    "PASS rejected ({}): {}",
                    pass_resp.code,
                    pass_resp.text()
                )));
            }
        }

        self.state = ConnectionState::Authenticated;

        let type_resp = self.control.command(&commands::type_("I")).await?;
        if !type_resp.is_success() {
            return Err(FtpError::from_reply(type_resp.code, type_resp.text().to_string()));
        }
        self.transfer_type = TransferType::Binary;

        Ok(())
    }

    /// Send QUIT and tear the connection down. Safe to call more than once.
    pub async fn disconnect(&mut self) -> Result<()> {
        if matches!(self.state, ConnectionState::Closed) {
            return Ok(());
        }
        let _ = self.control.command(commands::quit()).await;
        self.reset();
        Ok(())
    }

    /// Clear capabilities, queue, and connection flags back to defaults.
    /// Called automatically after `disconnect` and after an unrecoverable
    /// control-channel error.
    pub(super) fn reset(&mut self) {
        self.state = ConnectionState::Closed;
        self.capabilities = Capabilities::new();
        self.queue = RequestQueue::new(self.config.keep_finished_queue, self.config.finished_history_capacity);
    }

    /// Capabilities discovered via FEAT.
    pub fn features(&self) -> Vec<String> {
        self.capabilities.list()
    }

    /// Whether MODE Z compression can be negotiated on this connection.
    pub fn can_use_compression(&self) -> bool {
        self.capabilities.has_arg("MODE", "Z")
    }
}
