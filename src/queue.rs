//! Serialized command queue feeding the request engine.
//!
//! The control connection only ever has one request in flight at a time, so
//! this is a plain FIFO rather than the pooled, multi-connection
//! `TransferQueue` a higher-concurrency client would need.

use crate::request::{Request, RequestState};
use std::collections::VecDeque;

/// A FIFO of `Request`s plus an optional bounded history of finished ones.
pub struct RequestQueue {
    pending: VecDeque<Request>,
    active: Option<Request>,
    finished: VecDeque<Request>,
    keep_finished: bool,
    finished_capacity: usize,
}

impl RequestQueue {
    /// Create an empty queue. `keep_finished` controls whether completed
    /// requests are retained (bounded by `finished_capacity`) or dropped
    /// immediately once they finish.
    pub fn new(keep_finished: bool, finished_capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            active: None,
            finished: VecDeque::new(),
            keep_finished,
            finished_capacity,
        }
    }

    /// Enqueue a new request, returning its id.
    pub fn enqueue(&mut self, request: Request) -> u64 {
        let id = request.id;
        self.pending.push_back(request);
        id
    }

    /// Enqueue a request so it runs immediately after whatever is currently
    /// active, ahead of everything already pending. Never displaces the
    /// active request itself.
    pub fn prepend(&mut self, request: Request) -> u64 {
        let id = request.id;
        self.pending.push_front(request);
        id
    }

    /// True if no request is pending or currently active.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.active.is_none()
    }

    /// Number of requests waiting to be dispatched.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the next pending request and mark it active, provided no other
    /// request is currently active — the single-in-flight invariant the
    /// engine depends on.
    pub fn start_next(&mut self) -> Option<&mut Request> {
        if self.active.is_some() {
            return None;
        }
        let mut request = self.pending.pop_front()?;
        request.mark_active();
        self.active = Some(request);
        self.active.as_mut()
    }

    /// The currently active request, if any.
    pub fn active(&self) -> Option<&Request> {
        self.active.as_ref()
    }

    /// The currently active request, mutably.
    pub fn active_mut(&mut self) -> Option<&mut Request> {
        self.active.as_mut()
    }

    /// Move the active request into the finished history (or drop it) once
    /// its state has been set to `Finished` by the caller.
    pub fn retire_active(&mut self) -> Option<Request> {
        let request = self.active.take()?;
        debug_assert_eq!(request.state(), RequestState::Finished);
        if self.keep_finished {
            self.finished.push_back(request.clone());
            while self.finished.len() > self.finished_capacity {
                self.finished.pop_front();
            }
        }
        Some(request)
    }

    /// Finished requests retained so far (empty unless `keep_finished` was set).
    pub fn finished(&self) -> &VecDeque<Request> {
        &self.finished
    }
}
