//! Append-only, insertion-ordered event log
//!
//! Insertion order is arrival order, not sequence-number order, so that
//! out-of-order arrival stays observable during reconnection testing.
//! Entries are never mutated or pruned during a run.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::event::StreamEvent;

/// Shared handle to an ordered event log. Cloning is cheap; all clones
/// view the same log. One collector owns the writer side.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    inner: Arc<Mutex<Vec<StreamEvent>>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event, preserving arrival order.
    pub fn append(&self, event: StreamEvent) {
        self.inner.lock().push(event);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Point-in-time copy of the full log, in arrival order.
    pub fn snapshot(&self) -> Vec<StreamEvent> {
        self.inner.lock().clone()
    }

    /// Events satisfying `pred`, in arrival order. Does not mutate the log.
    pub fn filter<F>(&self, pred: F) -> Vec<StreamEvent>
    where
        F: Fn(&StreamEvent) -> bool,
    {
        self.inner.lock().iter().filter(|e| pred(e)).cloned().collect()
    }

    /// Current length, for use as a phase mark with [`count_since`].
    ///
    /// [`count_since`]: EventBuffer::count_since
    pub fn mark(&self) -> usize {
        self.len()
    }

    /// Number of events appended since a previous [`mark`]. This is a
    /// counting heuristic, not a causal correlation.
    ///
    /// [`mark`]: EventBuffer::mark
    pub fn count_since(&self, mark: usize) -> usize {
        self.len().saturating_sub(mark)
    }

    /// Poll until some event satisfies `pred` or the timeout elapses.
    /// Returns whether a match was found. Preferred over a blind settle
    /// delay when the caller has an explicit predicate.
    pub async fn wait_for<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&StreamEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if self.inner.lock().iter().any(|e| pred(e)) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
