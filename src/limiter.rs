//! Stream limiter: quantum-paced bandwidth throttling for transfer pipelines.
//!
//! Unlike a classic token-bucket gate where callers `acquire(n)` bytes before
//! sending, this limiter is wired directly into the pipeline as a transform:
//! each chunk written to (or read from) the data connection is split at the
//! per-quantum budget and the remainder is paced out over subsequent
//! quanta, so a single oversized chunk cannot blow through the configured
//! rate in one shot. Progress is published on a `watch` channel so a caller
//! can observe throughput without polling the transfer itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// Length of one pacing quantum. Matches the ~100ms granularity used
/// throughout the pipeline for throttling decisions — short enough that a
/// throttled transfer still looks smooth, long enough to avoid waking the
/// task hundreds of times a second.
const QUANTUM: Duration = Duration::from_millis(100);

/// Snapshot of a throttled transfer's progress, published after each chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    /// Total bytes paced through the limiter so far
    pub bytes_transferred: u64,
}

/// Paces writes to/from a data connection to a configured rate.
///
/// Cloning a `StreamLimiter` shares the same rate and progress channel —
/// clone it into both halves of a pipeline (e.g. reader and writer side)
/// when both need to observe the same budget.
#[derive(Clone)]
pub struct StreamLimiter {
    rate_bytes_per_sec: Option<u64>,
    bytes_transferred: Arc<std::sync::atomic::AtomicU64>,
    cancelled: Arc<AtomicBool>,
    progress_tx: watch::Sender<Progress>,
}

impl StreamLimiter {
    /// Create a limiter. `rate_bytes_per_sec = None` disables throttling —
    /// `pace` then returns the chunk immediately with no delay.
    pub fn new(rate_bytes_per_sec: Option<u64>) -> Self {
        let (progress_tx, _rx) = watch::channel(Progress::default());
        Self {
            rate_bytes_per_sec,
            bytes_transferred: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress_tx,
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// Signal the transfer driving this limiter to stop at the next chunk
    /// boundary (used to implement ABOR).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Pace `len` bytes worth of a chunk through the configured rate,
    /// sleeping as needed so the caller does not exceed it, then record the
    /// bytes and publish progress. Returns `Err` if cancelled mid-wait.
    pub async fn pace(&self, len: usize) -> Result<(), Cancelled> {
        if let Some(rate) = self.rate_bytes_per_sec {
            let budget = ((rate as f64) * QUANTUM.as_secs_f64()).max(1.0) as usize;
            let mut remaining = len;
            while remaining > 0 {
                if self.is_cancelled() {
                    return Err(Cancelled);
                }
                let take = remaining.min(budget);
                remaining -= take;
                if remaining > 0 {
                    let start = Instant::now();
                    tokio::time::sleep(QUANTUM).await;
                    let _ = start.elapsed();
                }
            }
        } else if self.is_cancelled() {
            return Err(Cancelled);
        }

        let total = self
            .bytes_transferred
            .fetch_add(len as u64, Ordering::SeqCst)
            + len as u64;
        let _ = self.progress_tx.send(Progress {
            bytes_transferred: total,
        });
        Ok(())
    }

    /// Total bytes paced through this limiter so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::SeqCst)
    }
}

/// Returned by `pace` when the limiter was cancelled mid-wait.
#[derive(Debug, Clone, Copy)]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unthrottled_limiter_paces_instantly() {
        let limiter = StreamLimiter::new(None);
        let start = Instant::now();
        limiter.pace(1_000_000).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.bytes_transferred(), 1_000_000);
    }

    #[tokio::test]
    async fn throttled_limiter_waits_for_extra_quanta() {
        let limiter = StreamLimiter::new(Some(1_000_000)); // 1MB/s -> ~100KB/quantum
        let start = Instant::now();
        limiter.pace(250_000).await.unwrap();
        // needs ~2 extra quanta beyond the first free one
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn cancel_stops_pacing() {
        let limiter = StreamLimiter::new(Some(1000));
        limiter.cancel();
        assert!(limiter.pace(10_000).await.is_err());
    }

    #[tokio::test]
    async fn progress_is_published() {
        let limiter = StreamLimiter::new(None);
        let mut rx = limiter.subscribe();
        limiter.pace(42).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().bytes_transferred, 42);
    }
}
