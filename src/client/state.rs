//! Connection state types for the FTP client

/// Control-connection state.
pub(super) enum ConnectionState {
    /// TCP (and, if configured, TLS) connected, greeting received, not yet logged in
    Ready,
    /// USER/PASS accepted
    Authenticated,
    /// Connection closed (QUIT sent, or the control socket died)
    Closed,
}

/// Transfer type set by the last `TYPE` command (RFC 959 §3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TransferType {
    Ascii,
    Binary,
}
