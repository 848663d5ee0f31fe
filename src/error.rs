//! FTP client error types

use thiserror::Error;

/// FTP protocol and connection errors
#[derive(Error, Debug)]
pub enum FtpError {
    /// IO error during network operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not establish the control connection
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// TLS negotiation (AUTH TLS / handshake) failed
    #[error("TLS negotiation failed: {0}")]
    TlsNegotiationFailed(String),

    /// Connection timed out
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Login (USER/PASS) was rejected
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Response did not parse, or violated the expected protocol shape
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Server response carried an unexpected reply code
    #[error("Server rejected command (code {code}): {message}")]
    ServerRejected {
        /// 3-digit FTP reply code
        code: u16,
        /// Trailing text of the reply
        message: String,
    },

    /// PASV could not be negotiated (not supported, or no free ports)
    #[error("Passive mode unavailable: {0}")]
    PassiveUnavailable(String),

    /// The data connection never completed within the configured timeout
    #[error("Data connection timed out")]
    DataConnectionTimeout,

    /// Caller supplied an invalid argument (empty path, negative offset, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failure while reading or writing a transfer pipeline
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Control connection was closed by the peer or locally
    #[error("Connection closed")]
    ConnectionClosed,

    /// A request was submitted while the engine had no open connection
    #[error("Not connected")]
    NotConnected,
}

/// Result type alias using FtpError
pub type Result<T> = std::result::Result<T, FtpError>;

impl FtpError {
    pub(crate) fn from_reply(code: u16, message: impl Into<String>) -> Self {
        FtpError::ServerRejected {
            code,
            message: message.into(),
        }
    }
}
