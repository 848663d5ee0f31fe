//! Transfer pipeline: the adapter chain between a data connection and the
//! caller's source/sink, in this order for a download:
//!
//! ```text
//! data-socket -> [MODE Z inflate] -> [StreamLimiter pacing] -> caller's sink
//! ```
//!
//! and the mirror image for an upload. Compression and throttling are each
//! optional stages selected per-request (MODE Z negotiation happens per
//! passive transfer, not once for the whole session).

use crate::error::{FtpError, Result};
use crate::limiter::StreamLimiter;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

const CHUNK_SIZE: usize = 64 * 1024;
const CODEC_BUFFER_SIZE: usize = 256 * 1024;

/// A connected data channel, plain or TLS-wrapped (PROT P reuses the control
/// channel's TLS session parameters but the data socket itself is a fresh
/// handshake per RFC 4217).
pub enum DataChannel {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for DataChannel {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataChannel::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            DataChannel::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DataChannel {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            DataChannel::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            DataChannel::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataChannel::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            DataChannel::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataChannel::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            DataChannel::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Drain `data` into `sink`, pacing via `limiter` and inflating if `compressed`.
/// Returns the number of wire bytes read off the data connection.
pub async fn download_into<W>(
    data: &mut DataChannel,
    sink: &mut W,
    limiter: &StreamLimiter,
    compressed: bool,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut inbuf = vec![0u8; CHUNK_SIZE];
    let mut outbuf = vec![0u8; CODEC_BUFFER_SIZE];
    let mut decompress = compressed.then(|| Decompress::new(false));
    let mut total_wire_bytes = 0u64;

    loop {
        let n = data.read(&mut inbuf).await.map_err(FtpError::Io)?;
        if n == 0 {
            break;
        }
        limiter
            .pace(n)
            .await
            .map_err(|_| FtpError::StreamError("transfer cancelled".into()))?;
        total_wire_bytes += n as u64;

        match decompress.as_mut() {
            None => sink.write_all(&inbuf[..n]).await.map_err(FtpError::Io)?,
            Some(decoder) => {
                let mut consumed = 0usize;
                loop {
                    let before_in = decoder.total_in();
                    let before_out = decoder.total_out();
                    decoder
                        .decompress(&inbuf[consumed..n], &mut outbuf, FlushDecompress::None)
                        .map_err(|e| FtpError::StreamError(format!("MODE Z inflate: {e}")))?;
                    let produced = (decoder.total_out() - before_out) as usize;
                    if produced > 0 {
                        sink.write_all(&outbuf[..produced]).await.map_err(FtpError::Io)?;
                    }
                    consumed += (decoder.total_in() - before_in) as usize;
                    if consumed >= n || (produced == 0 && decoder.total_in() == before_in) {
                        break;
                    }
                }
            }
        }
    }
    sink.flush().await.map_err(FtpError::Io)?;
    Ok(total_wire_bytes)
}

/// Drain `source` into `data`, pacing via `limiter` and deflating if `compressed`.
/// Returns the number of application bytes read from `source`.
pub async fn upload_from<R>(
    source: &mut R,
    data: &mut DataChannel,
    limiter: &StreamLimiter,
    compressed: bool,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut inbuf = vec![0u8; CHUNK_SIZE];
    let mut outbuf = vec![0u8; CODEC_BUFFER_SIZE];
    let mut compress = compressed.then(|| Compress::new(Compression::default(), false));
    let mut total_app_bytes = 0u64;

    loop {
        let n = source.read(&mut inbuf).await.map_err(FtpError::Io)?;
        if n == 0 {
            break;
        }
        total_app_bytes += n as u64;

        match compress.as_mut() {
            None => {
                limiter
                    .pace(n)
                    .await
                    .map_err(|_| FtpError::StreamError("transfer cancelled".into()))?;
                data.write_all(&inbuf[..n]).await.map_err(FtpError::Io)?;
            }
            Some(encoder) => {
                let mut consumed = 0usize;
                loop {
                    let before_in = encoder.total_in();
                    let before_out = encoder.total_out();
                    encoder
                        .compress(&inbuf[consumed..n], &mut outbuf, FlushCompress::None)
                        .map_err(|e| FtpError::StreamError(format!("MODE Z deflate: {e}")))?;
                    let produced = (encoder.total_out() - before_out) as usize;
                    if produced > 0 {
                        limiter
                            .pace(produced)
                            .await
                            .map_err(|_| FtpError::StreamError("transfer cancelled".into()))?;
                        data.write_all(&outbuf[..produced]).await.map_err(FtpError::Io)?;
                    }
                    consumed += (encoder.total_in() - before_in) as usize;
                    if consumed >= n || (produced == 0 && encoder.total_in() == before_in) {
                        break;
                    }
                }
            }
        }
    }

    if let Some(encoder) = compress.as_mut() {
        loop {
            let before_out = encoder.total_out();
            let status = encoder
                .compress(&[], &mut outbuf, FlushCompress::Finish)
                .map_err(|e| FtpError::StreamError(format!("MODE Z deflate finish: {e}")))?;
            let produced = (encoder.total_out() - before_out) as usize;
            if produced > 0 {
                data.write_all(&outbuf[..produced]).await.map_err(FtpError::Io)?;
            }
            if status == flate2::Status::StreamEnd {
                break;
            }
        }
    }
    data.flush().await.map_err(FtpError::Io)?;
    Ok(total_app_bytes)
}
