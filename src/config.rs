//! FTP client configuration

use crate::listing::{DefaultListingParser, ListingParser};
use std::sync::Arc;
use std::time::Duration;

/// FTP server connection configuration
///
/// Contains everything needed to open and authenticate a control connection.
///
/// # Example
///
/// ```
/// use ftp_rs::FtpConfig;
///
/// let config = FtpConfig::ftps("ftp.example.com", "user", "pass");
/// let config = FtpConfig::plain("ftp.example.com", "anonymous", "guest@example.com");
/// ```
#[must_use]
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FtpConfig {
    /// Server hostname (e.g., "ftp.example.com")
    pub host: String,

    /// Server port (typically 21)
    pub port: u16,

    /// Negotiate AUTH TLS/PBSZ 0/PROT P right after the greeting (explicit FTPS)
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: bool,

    /// Accept self-signed/expired/hostname-mismatched certificates
    ///
    /// **Security warning:** disables certificate validation entirely. Only use
    /// for testing or with servers you control on a trusted network.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_insecure_tls: bool,

    /// Username for USER/PASS login
    pub username: String,

    /// Password for USER/PASS login
    pub password: String,

    /// Timeout waiting for a PASV data connection to complete
    #[cfg_attr(feature = "serde", serde(default = "default_pasv_timeout"))]
    pub pasv_timeout: Duration,

    /// Number of times to retry PASV + data-connect before giving up on a request
    #[cfg_attr(feature = "serde", serde(default = "default_max_passive_retries"))]
    pub max_passive_retries: u32,

    /// Cap transfer throughput in bytes/second for both directions. `None`
    /// disables throttling. Overridden per-direction by `limit_upload`/
    /// `limit_download` when those are set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit_speed: Option<u64>,

    /// Cap upload throughput in bytes/second, overriding `limit_speed` for STOR/APPE.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit_upload: Option<u64>,

    /// Cap download throughput in bytes/second, overriding `limit_speed` for RETR/LIST/MLSD/NLST.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit_download: Option<u64>,

    /// Attempt MODE Z compression on passive transfers when the server
    /// advertises it via FEAT. Negotiated per-request; failure silently
    /// downgrades to stream mode.
    #[cfg_attr(feature = "serde", serde(default))]
    pub compression: bool,

    /// Keep finished requests in the queue's history ring instead of discarding them
    #[cfg_attr(feature = "serde", serde(default))]
    pub keep_finished_queue: bool,

    /// How many finished requests to retain when `keep_finished_queue` is set
    #[cfg_attr(feature = "serde", serde(default = "default_finished_history"))]
    pub finished_history_capacity: usize,

    /// Parser used to turn a LIST/MLSD response body into `FileItem`s
    #[cfg_attr(feature = "serde", serde(skip))]
    pub listing_parser: Arc<dyn ListingParser>,
}

impl std::fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("allow_insecure_tls", &self.allow_insecure_tls)
            .field("username", &self.username)
            .field("password", &"***")
            .field("pasv_timeout", &self.pasv_timeout)
            .field("max_passive_retries", &self.max_passive_retries)
            .field("limit_speed", &self.limit_speed)
            .field("limit_upload", &self.limit_upload)
            .field("limit_download", &self.limit_download)
            .field("compression", &self.compression)
            .field("keep_finished_queue", &self.keep_finished_queue)
            .field("finished_history_capacity", &self.finished_history_capacity)
            .finish()
    }
}

fn default_pasv_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_passive_retries() -> u32 {
    3
}

fn default_finished_history() -> usize {
    100
}

impl FtpConfig {
    /// Create a new configuration
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: bool,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            allow_insecure_tls: false,
            username: username.into(),
            password: password.into(),
            pasv_timeout: default_pasv_timeout(),
            max_passive_retries: default_max_passive_retries(),
            limit_speed: None,
            limit_upload: None,
            limit_download: None,
            compression: false,
            keep_finished_queue: false,
            finished_history_capacity: default_finished_history(),
            listing_parser: Arc::new(DefaultListingParser),
        }
    }

    /// Configuration for explicit FTPS (AUTH TLS negotiated after connect) on port 21
    pub fn ftps(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(host, 21, true, username, password)
    }

    /// Configuration for a plain, unencrypted connection on port 21
    ///
    /// **Warning:** credentials are transmitted in clear text.
    pub fn plain(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(host, 21, false, username, password)
    }

    /// Explicit FTPS that accepts self-signed certificates
    pub fn ftps_insecure(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut config = Self::ftps(host, username, password);
        config.allow_insecure_tls = true;
        config
    }

    /// Override the listing parser used by `list()`
    pub fn with_listing_parser(mut self, parser: Arc<dyn ListingParser>) -> Self {
        self.listing_parser = parser;
        self
    }

    /// Attempt MODE Z compression on passive transfers
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Cap transfer throughput in bytes/second for both directions
    pub fn with_limit_speed(mut self, bytes_per_sec: Option<u64>) -> Self {
        self.limit_speed = bytes_per_sec;
        self
    }

    /// Cap upload throughput in bytes/second, overriding `limit_speed` for STOR/APPE
    pub fn with_limit_upload(mut self, bytes_per_sec: Option<u64>) -> Self {
        self.limit_upload = bytes_per_sec;
        self
    }

    /// Cap download throughput in bytes/second, overriding `limit_speed` for RETR/LIST/MLSD/NLST
    pub fn with_limit_download(mut self, bytes_per_sec: Option<u64>) -> Self {
        self.limit_download = bytes_per_sec;
        self
    }
}
