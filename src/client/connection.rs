//! Connection management for the FTP control channel
//!
//! Handles TCP connection establishment, socket tuning, the explicit AUTH TLS
//! upgrade, and framing of `FtpResponse`s off the wire.

use crate::config::FtpConfig;
use crate::error::{FtpError, Result};
use crate::pipeline::DataChannel;
use crate::response::{parse_frame, FtpResponse, PassiveAddr};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// TCP connection timeout
const TCP_CONNECT_TIMEOUT_SECS: u64 = 120;

/// TLS handshake timeout
const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 60;

/// Read buffer growth chunk while accumulating a response frame
const READ_CHUNK: usize = 8 * 1024;

/// Dangerous certificate verifier that accepts all certificates
///
/// **Security Warning:** this disables all certificate validation, making
/// connections vulnerable to man-in-the-middle attacks. Only use with
/// `allow_insecure_tls` against servers you trust on a secure network.
#[derive(Debug)]
pub(super) struct DangerousAcceptAnyCertificate;

impl ServerCertVerifier for DangerousAcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

fn tls_client_config(allow_insecure: bool) -> ClientConfig {
    use tokio_rustls::rustls::crypto::{ring, CryptoProvider};
    let _ = CryptoProvider::install_default(ring::default_provider());

    if allow_insecure {
        warn!("TLS certificate validation disabled - connection vulnerable to MITM attacks");
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousAcceptAnyCertificate))
            .with_no_client_auth()
    } else {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    }
}

/// Upgrade a plain TCP stream to TLS against an already-built client config.
/// Reusing the same `Arc<ClientConfig>` (and its session cache) across the
/// control upgrade and every subsequent data-channel handshake is what lets
/// rustls resume the TLS session instead of renegotiating from scratch.
pub(super) async fn tls_connect_with_config(
    stream: TcpStream,
    host: &str,
    tls_config: Arc<ClientConfig>,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = TlsConnector::from(tls_config);
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| FtpError::TlsNegotiationFailed(format!("invalid hostname: {e}")))?;

    timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, stream),
    )
    .await
    .map_err(|_| FtpError::Timeout("TLS handshake".into()))?
    .map_err(|e| FtpError::TlsNegotiationFailed(e.to_string()))
}

/// Open a TCP connection tuned for a request/response control protocol:
/// `TCP_NODELAY` to avoid Nagle-induced latency on small commands.
pub(super) async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    use std::net::ToSocketAddrs;
    let addr = format!("{host}:{port}");
    let socket_addr = addr
        .to_socket_addrs()
        .map_err(|e| FtpError::ConnectFailed(format!("failed to resolve {addr}: {e}")))?
        .next()
        .ok_or_else(|| FtpError::ConnectFailed(format!("no address resolved for {addr}")))?;

    use socket2::{Domain, Protocol, Socket, Type};
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket =
        Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(FtpError::Io)?;
    socket.set_nodelay(true).map_err(FtpError::Io)?;

    let stream = timeout(
        Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        tokio::task::spawn_blocking(move || -> std::io::Result<std::net::TcpStream> {
            socket.connect(&socket_addr.into())?;
            socket.set_nonblocking(true)?;
            Ok(socket.into())
        }),
    )
    .await
    .map_err(|_| FtpError::Timeout(format!("connecting to {addr}")))?
    .map_err(|e| FtpError::Io(std::io::Error::other(format!("task join error: {e}"))))?
    .map_err(FtpError::Io)?;

    TcpStream::from_std(stream).map_err(FtpError::Io)
}

/// Control-channel transport. `Upgrading` is a momentary placeholder that
/// only exists between taking the plain socket out of `self.transport` and
/// writing the TLS-wrapped replacement back in during `upgrade` — it is never
/// read from or written to.
enum ControlTransport {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
    Upgrading,
}

impl AsyncRead for ControlTransport {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            ControlTransport::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            ControlTransport::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
            ControlTransport::Upgrading => unreachable!("read during TLS upgrade"),
        }
    }
}

impl AsyncWrite for ControlTransport {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            ControlTransport::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            ControlTransport::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
            ControlTransport::Upgrading => unreachable!("write during TLS upgrade"),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            ControlTransport::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            ControlTransport::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
            ControlTransport::Upgrading => unreachable!("flush during TLS upgrade"),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            ControlTransport::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            ControlTransport::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
            ControlTransport::Upgrading => unreachable!("shutdown during TLS upgrade"),
        }
    }
}

/// The FTP control channel: a framed, plain-or-TLS stream plus the raw bytes
/// read so far that have not yet formed a complete reply.
pub(super) struct ControlConnection {
    transport: ControlTransport,
    buf: Vec<u8>,
    /// Set once AUTH TLS succeeds; reused for every data-channel handshake so
    /// the session cache lets the server resume rather than renegotiate.
    tls_config: Option<Arc<ClientConfig>>,
}

impl ControlConnection {
    /// Connect, read the greeting, and negotiate AUTH TLS if `config.tls`.
    pub(super) async fn connect(config: &Arc<FtpConfig>) -> Result<(Self, FtpResponse)> {
        debug!("connecting to FTP server {}:{}", config.host, config.port);
        let tcp = connect_tcp(&config.host, config.port).await?;
        let mut conn = ControlConnection {
            transport: ControlTransport::Plain(tcp),
            buf: Vec::with_capacity(READ_CHUNK),
            tls_config: None,
        };

        let greeting = conn.read_response().await?;
        debug!("greeting: {} {}", greeting.code, greeting.text());
        if !greeting.is_success() && !greeting.is_preliminary() {
            return Err(FtpError::from_reply(greeting.code, greeting.text().to_string()));
        }

        if config.tls {
            conn.upgrade(config).await?;
        }

        Ok((conn, greeting))
    }

    /// Upgrade an already-connected plain control channel to TLS via AUTH TLS.
    /// Only valid while the transport is still `Plain`.
    async fn upgrade(&mut self, config: &Arc<FtpConfig>) -> Result<()> {
        let resp = self.command("AUTH TLS").await?;
        if !resp.is_success() {
            return Err(FtpError::TlsNegotiationFailed(format!(
                "server rejected AUTH TLS: {}",
                resp.text()
            )));
        }

        let tcp = match std::mem::replace(&mut self.transport, ControlTransport::Upgrading) {
            ControlTransport::Plain(tcp) => tcp,
            other => {
                self.transport = other;
                return Err(FtpError::TlsNegotiationFailed(
                    "control channel already upgraded".into(),
                ));
            }
        };
        let tls_config = Arc::new(tls_client_config(config.allow_insecure_tls));
        let tls = tls_connect_with_config(tcp, &config.host, Arc::clone(&tls_config)).await?;
        self.transport = ControlTransport::Tls(Box::new(tls));
        self.tls_config = Some(tls_config);
        self.buf.clear();

        let pbsz = self.command("PBSZ 0").await?;
        if !pbsz.is_success() {
            return Err(FtpError::TlsNegotiationFailed(format!(
                "PBSZ 0 rejected: {}",
                pbsz.text()
            )));
        }
        let prot = self.command("PROT P").await?;
        if !prot.is_success() {
            return Err(FtpError::TlsNegotiationFailed(format!(
                "PROT P rejected: {}",
                prot.text()
            )));
        }
        Ok(())
    }

    /// Send a bare command (no trailing CRLF) and read back one reply.
    pub(super) async fn command(&mut self, cmd: &str) -> Result<FtpResponse> {
        self.send(cmd).await?;
        self.read_response().await
    }

    /// Send a bare command, appending the CRLF terminator.
    pub(super) async fn send(&mut self, cmd: &str) -> Result<()> {
        let line = format!("{cmd}\r\n");
        self.transport
            .write_all(line.as_bytes())
            .await
            .map_err(FtpError::Io)?;
        self.transport.flush().await.map_err(FtpError::Io)?;
        Ok(())
    }

    /// Whether the control channel has been upgraded to TLS.
    pub(super) fn is_tls(&self) -> bool {
        matches!(self.transport, ControlTransport::Tls(_))
    }

    /// Read and frame exactly one reply off the control channel.
    pub(super) async fn read_response(&mut self) -> Result<FtpResponse> {
        loop {
            if let Some((resp, consumed)) = parse_frame(&self.buf)? {
                self.buf.drain(..consumed);
                return Ok(resp);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .transport
                .read(&mut chunk)
                .await
                .map_err(FtpError::Io)?;
            if n == 0 {
                return Err(FtpError::ConnectionClosed);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Open a data connection to a PASV-advertised address, wrapping it in
    /// TLS (reusing the control channel's session parameters) when the
    /// control channel itself is TLS.
    pub(super) async fn open_passive(
        &self,
        config: &Arc<FtpConfig>,
        addr: PassiveAddr,
    ) -> Result<DataChannel> {
        let socket_addr = SocketAddr::from((addr.ip, addr.port));
        let connect = async {
            let tcp = connect_tcp(&socket_addr.ip().to_string(), socket_addr.port()).await?;
            match &self.tls_config {
                Some(tls_config) => {
                    let tls =
                        tls_connect_with_config(tcp, &config.host, Arc::clone(tls_config)).await?;
                    Ok(DataChannel::Tls(Box::new(tls)))
                }
                None => Ok(DataChannel::Plain(tcp)),
            }
        };
        timeout(config.pasv_timeout, connect)
            .await
            .map_err(|_| FtpError::DataConnectionTimeout)?
    }
}
