//! Bounded single-consumer tick queue. `push` never blocks the broker
//! callback thread: on overflow the oldest batch is
//! discarded and the drop is telemetered, never silently swallowed.

use crate::tick::TickBatch;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::warn;

pub struct TickQueue {
    inner: Mutex<VecDeque<TickBatch>>,
    notify: Notify,
    capacity: usize,
    dropped_total: AtomicU64,
}

impl TickQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            notify: Notify::new(),
            capacity: capacity.max(1),
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Non-blocking enqueue from the broker callback.
    pub fn push(&self, batch: TickBatch) {
        let mut dropped_now = 0u64;
        {
            let mut queue = self.inner.lock();
            while queue.len() >= self.capacity {
                queue.pop_front();
                dropped_now += 1;
            }
            queue.push_back(batch);
        }
        if dropped_now > 0 {
            self.dropped_total.fetch_add(dropped_now, Ordering::Relaxed);
            warn!(dropped = dropped_now, "tick queue full, dropped oldest batches");
        }
        self.notify.notify_one();
    }

    /// Awaits and pops the next batch; used by the single-consumer drain task.
    pub async fn pop(&self) -> TickBatch {
        loop {
            if let Some(batch) = self.inner.lock().pop_front() {
                return batch;
            }
            self.notify.notified().await;
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn batch() -> TickBatch {
        TickBatch {
            received_at: Utc::now(),
            ticks: vec![],
        }
    }

    #[tokio::test]
    async fn push_then_pop_round_trips() {
        let q = TickQueue::new(4);
        q.push(batch());
        let popped = q.pop().await;
        assert_eq!(popped.ticks.len(), 0);
    }

    #[test]
    fn overflow_drops_oldest_and_counts_it() {
        let q = TickQueue::new(2);
        q.push(batch());
        q.push(batch());
        q.push(batch());
        assert_eq!(q.len(), 2);
        assert_eq!(q.dropped_total(), 1);
    }
}
