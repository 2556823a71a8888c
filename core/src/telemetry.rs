//! Bounded in-memory history for anything an admin surface wants to show
//! "last N of" without a database: recent fills, recent halts, recent
//! optimizer verdicts. Same bounded-drain shape as [`crate::halt::HaltBus`]'s
//! report log, pulled out so other components don't each reimplement it.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Fixed-capacity FIFO. Cloning shares the same backing buffer.
#[derive(Debug, Clone)]
pub struct TelemetryRing<T> {
    inner: Arc<RwLock<VecDeque<T>>>,
    capacity: usize,
}

impl<T> TelemetryRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    /// Pushes `item`, evicting the oldest entry once `capacity` is exceeded.
    pub fn push(&self, item: T) {
        let mut buf = self.inner.write();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<T: Clone> TelemetryRing<T> {
    /// Snapshot, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.read().iter().cloned().collect()
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        let buf = self.inner.read();
        let skip = buf.len().saturating_sub(n);
        buf.iter().skip(skip).cloned().collect()
    }
}
