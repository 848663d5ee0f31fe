//! Request Engine: queue lifecycle, PASV negotiation, MODE Z negotiation, and
//! the passive-transfer protocol shared by every data-moving facade verb.
//!
//! The control connection only ever has one command in flight, so the engine
//! needs no busy flag: every verb method takes `&mut self` and the borrow
//! checker enforces the single-in-flight invariant for free.

use super::FtpClient;
use crate::commands;
use crate::error::{FtpError, Result};
use crate::limiter::StreamLimiter;
use crate::pipeline::{self, DataChannel};
use crate::request::Request;
use crate::response::{parse_pasv, FtpResponse};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

impl FtpClient {
    /// Run a simple (non-data) command through the request queue lifecycle.
    /// Returns the response even on a non-2xx reply code so callers (e.g.
    /// `mkdir`'s SITE MKDIR fallback) can inspect it themselves; only a
    /// transport-level error marks the request as failed here.
    pub(super) async fn dispatch_simple(
        &mut self,
        verb: &str,
        argument: Option<String>,
        cmd: &str,
    ) -> Result<FtpResponse> {
        self.reject_if_broken()?;
        let request = Request::new(verb, argument);
        self.queue.enqueue(request);
        self.queue.start_next();

        let result = self.control.command(cmd).await;
        self.finish_active(&result);
        result
    }

    /// A connection that has seen a transport-level failure is never reused —
    /// fail fast instead of writing a command onto a socket already known to
    /// be dead.
    fn reject_if_broken(&self) -> Result<()> {
        if self.is_broken() {
            Err(FtpError::NotConnected)
        } else {
            Ok(())
        }
    }

    fn finish_active(&mut self, result: &Result<FtpResponse>) {
        if let Some(active) = self.queue.active_mut() {
            match result {
                Ok(resp) if !resp.is_error() => active.mark_finished(),
                Ok(resp) => active.mark_error(format!("{}: {}", resp.code, resp.text())),
                Err(e) => active.mark_error(e.to_string()),
            }
        }
        if is_transport_failure(result.as_ref().err()) {
            self.mark_broken();
        }
        self.queue.retire_active();
    }

    /// Negotiate a fresh passive data channel. Retries cover a malformed or
    /// rejected PASV reply (up to `config.max_passive_retries` times); a
    /// TCP/TLS connect failure on the resulting address is never retried.
    pub(super) async fn negotiate_pasv(&mut self) -> Result<DataChannel> {
        let mut last_err = None;
        for attempt in 0..=self.config.max_passive_retries {
            let resp = self.control.command(commands::pasv()).await?;
            if !resp.is_success() {
                last_err = Some(FtpError::PassiveUnavailable(format!(
                    "{}: {}",
                    resp.code,
                    resp.text()
                )));
                continue;
            }
            let Some(addr) = parse_pasv(resp.text()) else {
                warn!("malformed PASV reply on attempt {attempt}: {}", resp.text());
                last_err = Some(FtpError::PassiveUnavailable(format!(
                    "could not parse PASV reply: {}",
                    resp.text()
                )));
                continue;
            };
            return self.control.open_passive(&self.config, addr).await;
        }
        Err(last_err.unwrap_or_else(|| FtpError::PassiveUnavailable("PASV negotiation exhausted".into())))
    }

    /// Negotiate MODE Z for one passive transfer if `config.compression` is
    /// set and the server advertised it via FEAT. A rejected MODE Z is never
    /// fatal — the transfer just proceeds uncompressed.
    pub(super) async fn negotiate_compression(&mut self) -> bool {
        if !self.config.compression || !self.can_use_compression() {
            return false;
        }
        match self.control.command(&commands::mode("Z")).await {
            Ok(resp) if resp.is_success() => true,
            Ok(resp) => {
                debug!("server rejected MODE Z ({}): {}", resp.code, resp.text());
                false
            }
            Err(e) => {
                debug!("MODE Z negotiation failed: {e}");
                false
            }
        }
    }

    /// Restore MODE S after a transfer that engaged MODE Z. Best-effort: a
    /// failure here never fails a transfer that already completed.
    async fn restore_stream_mode(&mut self, compressed: bool) {
        if compressed {
            if let Err(e) = self.control.command(&commands::mode("S")).await {
                warn!("failed to restore MODE S after compressed transfer: {e}");
            }
        }
    }

    /// Run a passive download: negotiate MODE Z and PASV, send `cmd`, then
    /// race draining the data channel against the final control response —
    /// per RFC 959 the two can arrive in either order.
    pub(super) async fn run_passive_download<W>(
        &mut self,
        verb: &str,
        argument: Option<String>,
        cmd: &str,
        sink: &mut W,
        limiter: &StreamLimiter,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        self.reject_if_broken()?;
        let request = Request::new(verb, argument);
        self.queue.enqueue(request);
        self.queue.start_next();

        let outcome = self.run_passive_download_inner(cmd, sink, limiter).await;
        self.finish_transfer(&outcome);
        outcome
    }

    async fn run_passive_download_inner<W>(
        &mut self,
        cmd: &str,
        sink: &mut W,
        limiter: &StreamLimiter,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let compressed = self.negotiate_compression().await;
        let mut data = self.negotiate_pasv().await?;

        self.control.send(cmd).await?;
        let preliminary = self.control.read_response().await?;
        if !preliminary.is_preliminary() {
            self.restore_stream_mode(compressed).await;
            return Err(FtpError::from_reply(preliminary.code, preliminary.text().to_string()));
        }

        let (drain_result, final_result) = tokio::join!(
            pipeline::download_into(&mut data, sink, limiter, compressed),
            self.control.read_response()
        );
        self.restore_stream_mode(compressed).await;

        let bytes = drain_result?;
        let final_resp = final_result?;
        if !final_resp.is_success() {
            return Err(FtpError::from_reply(final_resp.code, final_resp.text().to_string()));
        }
        Ok(bytes)
    }

    /// Run a passive upload: negotiate MODE Z and PASV, send `cmd`, drain
    /// `source` into the data channel, close it, then read the final
    /// response (which servers only send once they see our EOF).
    pub(super) async fn run_passive_upload<R>(
        &mut self,
        verb: &str,
        argument: Option<String>,
        cmd: &str,
        source: &mut R,
        limiter: &StreamLimiter,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        self.reject_if_broken()?;
        let request = Request::new(verb, argument);
        self.queue.enqueue(request);
        self.queue.start_next();

        let outcome = self.run_passive_upload_inner(cmd, source, limiter).await;
        self.finish_transfer(&outcome);
        outcome
    }

    async fn run_passive_upload_inner<R>(
        &mut self,
        cmd: &str,
        source: &mut R,
        limiter: &StreamLimiter,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let compressed = self.negotiate_compression().await;
        let mut data = self.negotiate_pasv().await?;

        self.control.send(cmd).await?;
        let preliminary = self.control.read_response().await?;
        if !preliminary.is_preliminary() {
            self.restore_stream_mode(compressed).await;
            return Err(FtpError::from_reply(preliminary.code, preliminary.text().to_string()));
        }

        let upload_result = pipeline::upload_from(source, &mut data, limiter, compressed).await;
        drop(data);
        let bytes = match upload_result {
            Ok(bytes) => bytes,
            Err(e) => {
                self.restore_stream_mode(compressed).await;
                return Err(e);
            }
        };

        let final_resp = self.control.read_response().await;
        self.restore_stream_mode(compressed).await;
        let final_resp = final_resp?;
        if !final_resp.is_success() {
            return Err(FtpError::from_reply(final_resp.code, final_resp.text().to_string()));
        }
        Ok(bytes)
    }

    fn finish_transfer(&mut self, outcome: &Result<u64>) {
        if let Some(active) = self.queue.active_mut() {
            match outcome {
                Ok(bytes) => {
                    active.add_bytes_transferred(*bytes);
                    active.mark_finished();
                }
                Err(e) => active.mark_error(e.to_string()),
            }
        }
        if is_transport_failure(outcome.as_ref().err()) {
            self.mark_broken();
        }
        self.queue.retire_active();
    }

    /// Send ABOR. When `limiter` is given (a transfer is in flight), cancels
    /// it first so the pipeline loop on the other task stops at the next
    /// chunk boundary instead of racing the control reply.
    pub(super) async fn abort_active(&mut self, limiter: Option<&StreamLimiter>) -> Result<()> {
        if let Some(limiter) = limiter {
            limiter.cancel();
        }
        let resp = self.control.command(commands::abor()).await;
        if is_transport_failure(resp.as_ref().err()) {
            self.mark_broken();
        }
        let resp = resp?;
        if resp.is_success() || resp.code == 426 {
            Ok(())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }
}

/// Whether `err` reflects the control or data *transport* failing outright
/// (socket error, unexpected close) rather than the server simply rejecting a
/// command with a normal reply code. A transport failure means the control
/// connection can no longer be trusted for any further command — the caller
/// should disconnect and reconnect rather than keep submitting requests.
fn is_transport_failure(err: Option<&FtpError>) -> bool {
    matches!(
        err,
        Some(FtpError::Io(_) | FtpError::ConnectionClosed | FtpError::ProtocolError(_))
    )
}
