//! Request value object: one FTP command moving through its lifecycle.
//!
//! A `Request` is a plain state machine, not an active task — the engine
//! drives it forward by calling `mark_active`/`mark_finished`/`mark_error` at
//! the appropriate points. States move forward only: `Pending -> Active ->
//! Finished`, and `error` always lands in `Finished` too.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a `Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Queued, not yet sent to the server
    Pending,
    /// Command sent, awaiting completion (including any data transfer)
    Active,
    /// Done — check `error` to distinguish success from failure
    Finished,
}

/// One FTP command as it is queued, dispatched, and completed.
#[derive(Debug, Clone)]
pub struct Request {
    /// Monotonically increasing identifier, unique within the process
    pub id: u64,
    /// FTP verb this request carries out (e.g. "RETR", "STOR", "MKD")
    pub verb: String,
    /// Verb argument, if any (e.g. the remote path)
    pub argument: Option<String>,
    state: RequestState,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    /// Bytes moved over the data connection, if this request involved one
    pub bytes_transferred: u64,
    /// Set once the request reaches `Finished` in error
    pub error: Option<String>,
}

impl Request {
    /// Construct a new, pending request
    pub fn new(verb: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            verb: verb.into(),
            argument,
            state: RequestState::Pending,
            start_time: None,
            end_time: None,
            bytes_transferred: 0,
            error: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Transition `Pending -> Active`, recording the start timestamp.
    ///
    /// Calling this on a request that is not `Pending` is a caller bug; it is
    /// a no-op rather than a panic since the engine never retries a dispatch
    /// once sent.
    pub fn mark_active(&mut self) {
        if self.state == RequestState::Pending {
            self.state = RequestState::Active;
            self.start_time = Some(Instant::now());
        }
    }

    /// Transition `Active -> Finished` successfully.
    pub fn mark_finished(&mut self) {
        self.state = RequestState::Finished;
        self.end_time = Some(Instant::now());
    }

    /// Transition to `Finished` carrying an error. Valid from any state —
    /// a request can fail before it was ever dispatched (e.g. queue
    /// validation) as well as mid-transfer.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.state = RequestState::Finished;
        self.error = Some(message.into());
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.end_time = Some(Instant::now());
    }

    /// Record bytes moved so far; callers add to this as a transfer progresses.
    pub fn add_bytes_transferred(&mut self, bytes: u64) {
        self.bytes_transferred += bytes;
    }

    /// Wall-clock time the request spent `Active`, once finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Average transfer rate in bytes/second, once finished. `None` if the
    /// request never started, or finished instantaneously.
    pub fn average_speed(&self) -> Option<f64> {
        let duration = self.duration()?.as_secs_f64();
        if duration <= 0.0 {
            return None;
        }
        Some(self.bytes_transferred as f64 / duration)
    }

    /// Whether this request finished successfully
    pub fn is_success(&self) -> bool {
        self.state == RequestState::Finished && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_is_pending() {
        let req = Request::new("RETR", Some("file.txt".into()));
        assert_eq!(req.state(), RequestState::Pending);
        assert!(req.duration().is_none());
    }

    #[test]
    fn ids_are_monotonic() {
        let a = Request::new("PWD", None);
        let b = Request::new("PWD", None);
        assert!(b.id > a.id);
    }

    #[test]
    fn lifecycle_pending_to_active_to_finished() {
        let mut req = Request::new("RETR", Some("file.txt".into()));
        req.mark_active();
        assert_eq!(req.state(), RequestState::Active);
        req.add_bytes_transferred(1024);
        req.mark_finished();
        assert_eq!(req.state(), RequestState::Finished);
        assert!(req.is_success());
        assert_eq!(req.bytes_transferred, 1024);
        assert!(req.duration().is_some());
    }

    #[test]
    fn mark_error_finishes_with_error_set() {
        let mut req = Request::new("RETR", Some("file.txt".into()));
        req.mark_active();
        req.mark_error("connection reset");
        assert_eq!(req.state(), RequestState::Finished);
        assert!(!req.is_success());
        assert_eq!(req.error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn mark_error_before_dispatch_still_finishes() {
        let mut req = Request::new("MKD", Some("dir".into()));
        req.mark_error("queue full");
        assert_eq!(req.state(), RequestState::Finished);
        assert!(req.duration().is_some());
    }

    #[test]
    fn average_speed_requires_positive_duration() {
        let mut req = Request::new("RETR", Some("file.txt".into()));
        req.mark_active();
        req.add_bytes_transferred(2048);
        req.mark_finished();
        assert!(req.average_speed().unwrap() >= 0.0);
    }
}
