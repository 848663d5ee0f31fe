//! Data-moving facade verbs: directory listings, get/put/append, and abort.
//!
//! Every verb here goes through the Request Engine's passive-transfer
//! protocol (`run_passive_download`/`run_passive_upload` in `engine.rs`),
//! which owns PASV negotiation, MODE Z negotiation, and the data-channel
//! lifecycle. This module only picks the command, the pipeline direction,
//! and how to translate the drained bytes into the verb's return type.

use super::FtpClient;
use crate::commands;
use crate::error::{FtpError, Result};
use crate::limiter::StreamLimiter;
use crate::listing::FileItem;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite};

/// Where the bytes for `put`/`append` come from: a local file path (opened
/// lazily), or an in-memory buffer. Callers with an arbitrary pre-existing
/// `AsyncRead` (e.g. a pipe, or bytes generated on the fly) should call
/// [`FtpClient::put_reader`]/[`FtpClient::append_reader`] directly instead of
/// going through this enum.
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::Path(path.to_path_buf())
    }
}

impl From<&str> for UploadSource {
    fn from(path: &str) -> Self {
        UploadSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        UploadSource::Bytes(bytes)
    }
}

impl From<&[u8]> for UploadSource {
    fn from(bytes: &[u8]) -> Self {
        UploadSource::Bytes(bytes.to_vec())
    }
}

impl FtpClient {
    fn download_limiter(&self) -> StreamLimiter {
        StreamLimiter::new(self.config.limit_download.or(self.config.limit_speed))
    }

    fn upload_limiter(&self) -> StreamLimiter {
        StreamLimiter::new(self.config.limit_upload.or(self.config.limit_speed))
    }

    /// Directory listing via `LIST`, parsed through the configured
    /// [`crate::listing::ListingParser`]. `all` adds the `-A` flag most
    /// servers use to also show dotfiles.
    pub async fn list(&mut self, path: Option<&str>, all: bool) -> Result<Vec<FileItem>> {
        let body = self.list_body(path, all).await?;
        Ok(self.config.listing_parser.parse(&body))
    }

    async fn list_body(&mut self, path: Option<&str>, all: bool) -> Result<String> {
        let cmd = if all { commands::list_all(path) } else { commands::list(path) };
        let limiter = self.download_limiter();
        let mut buf = Vec::new();
        self.run_passive_download("LIST", path.map(str::to_string), &cmd, &mut buf, &limiter)
            .await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Directory listing via `MLSD` (RFC 3659), parsed through the same
    /// `ListingParser` as `list` — the default parser recognizes MLSD's
    /// `key=value;...` fact format directly.
    pub async fn mlsd(&mut self, path: Option<&str>) -> Result<Vec<FileItem>> {
        let cmd = commands::mlsd(path);
        let limiter = self.download_limiter();
        let mut buf = Vec::new();
        self.run_passive_download("MLSD", path.map(str::to_string), &cmd, &mut buf, &limiter)
            .await?;
        let body = String::from_utf8_lossy(&buf).into_owned();
        Ok(self.config.listing_parser.parse(&body))
    }

    /// Bare filenames via `NLST`, one per line, with blank lines dropped.
    pub async fn nlst(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        let cmd = commands::nlst(path);
        let limiter = self.download_limiter();
        let mut buf = Vec::new();
        self.run_passive_download("NLST", path.map(str::to_string), &cmd, &mut buf, &limiter)
            .await?;
        Ok(String::from_utf8_lossy(&buf)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Download a remote file into an in-memory buffer.
    pub async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.get_into(path, &mut buf).await?;
        Ok(buf)
    }

    /// Download a remote file straight into a local path, creating it (and
    /// any missing parent directories) if necessary.
    pub async fn get_to_file(&mut self, remote_path: &str, local_path: impl AsRef<Path>) -> Result<u64> {
        let local_path = local_path.as_ref();
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(FtpError::Io)?;
        }
        let mut file = File::create(local_path).await.map_err(FtpError::Io)?;
        self.get_into(remote_path, &mut file).await
    }

    /// Download a remote file (`RETR`) into an arbitrary sink, pacing
    /// through the configured download rate and inflating MODE Z if
    /// negotiated. Returns the number of bytes written to `sink`.
    pub async fn get_into<W>(&mut self, path: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let limiter = self.download_limiter();
        self.get_into_with_limiter(path, sink, &limiter).await
    }

    /// As [`get_into`](Self::get_into), but pacing through a caller-supplied
    /// limiter. Pass a limiter you have kept a clone of so another task can
    /// call [`StreamLimiter::cancel`] to interrupt the transfer mid-flight —
    /// the single control connection otherwise gives no way to reach a
    /// transfer already in progress.
    pub async fn get_into_with_limiter<W>(
        &mut self,
        path: &str,
        sink: &mut W,
        limiter: &StreamLimiter,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let cmd = commands::retr(path);
        self.run_passive_download("RETR", Some(path.to_string()), &cmd, sink, limiter).await
    }

    /// Upload `source` to `dst` via `STOR`, replacing any existing file.
    pub async fn put(&mut self, source: impl Into<UploadSource>, dst: &str) -> Result<bool> {
        self.store(source.into(), dst, false).await
    }

    /// Upload `source`, appending to `dst` via `APPE` (creating it if absent).
    pub async fn append(&mut self, source: impl Into<UploadSource>, dst: &str) -> Result<bool> {
        self.store(source.into(), dst, true).await
    }

    async fn store(&mut self, source: UploadSource, dst: &str, append: bool) -> Result<bool> {
        if dst.is_empty() {
            return Err(FtpError::InvalidInput("destination path is empty".into()));
        }
        match source {
            UploadSource::Path(path) => {
                let mut file = File::open(&path).await.map_err(|e| {
                    FtpError::InvalidInput(format!("upload source {} is not a readable file: {e}", path.display()))
                })?;
                self.put_reader(&mut file, dst, append).await
            }
            UploadSource::Bytes(bytes) => {
                let mut cursor = Cursor::new(bytes);
                self.put_reader(&mut cursor, dst, append).await
            }
        }
    }

    /// Upload from an arbitrary pre-existing `AsyncRead` — the third input
    /// shape the spec allows alongside a path or an in-memory buffer.
    pub async fn put_reader<R>(&mut self, source: &mut R, dst: &str, append: bool) -> Result<bool>
    where
        R: AsyncRead + Unpin,
    {
        let limiter = self.upload_limiter();
        self.put_reader_with_limiter(source, dst, append, &limiter).await
    }

    /// As [`put_reader`](Self::put_reader), but pacing through a
    /// caller-supplied limiter (see [`get_into_with_limiter`](Self::get_into_with_limiter)
    /// for why you would want to keep a clone of it).
    pub async fn put_reader_with_limiter<R>(
        &mut self,
        source: &mut R,
        dst: &str,
        append: bool,
        limiter: &StreamLimiter,
    ) -> Result<bool>
    where
        R: AsyncRead + Unpin,
    {
        let (verb, cmd) = if append {
            ("APPE", commands::appe(dst))
        } else {
            ("STOR", commands::stor(dst))
        };
        self.run_passive_upload(verb, Some(dst.to_string()), &cmd, source, limiter).await?;
        Ok(true)
    }

    /// Send `ABOR`. Pass the limiter of a transfer you are concurrently
    /// driving elsewhere (e.g. via `tokio::select!` against the same future)
    /// to cancel it first; pass `None` to just abort a queued-but-not-yet-
    /// dispatched request. Returns `true` once the server confirms (`226` or
    /// the mid-transfer `426`).
    pub async fn abort(&mut self, limiter: Option<&StreamLimiter>) -> Result<bool> {
        self.abort_active(limiter).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_source_from_str_is_a_path() {
        match UploadSource::from("/tmp/testdata.bin") {
            UploadSource::Path(p) => assert_eq!(p, PathBuf::from("/tmp/testdata.bin")),
            UploadSource::Bytes(_) => panic!("expected Path variant"),
        }
    }

    #[test]
    fn upload_source_from_bytes_is_bytes() {
        match UploadSource::from(vec![1u8, 2, 3]) {
            UploadSource::Bytes(b) => assert_eq!(b, vec![1, 2, 3]),
            UploadSource::Path(_) => panic!("expected Bytes variant"),
        }
    }
}
