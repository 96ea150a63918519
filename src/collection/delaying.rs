//! Blocking queue with deferred enqueue, built on the timer scheduler.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::blocking::BlockingQueue;
use crate::timer::TimerScheduler;

/// A [`BlockingQueue`] that can additionally accept items scheduled to
/// appear after a delay.
///
/// `push_after` registers a one-shot timer with the associated scheduler;
/// the item becomes observable through `pop` only once the timer fires.
/// `shutdown` cascades to both the queue and the scheduler.
pub struct DelayingQueue<T: Send + 'static> {
    queue: Arc<BlockingQueue<T>>,
    scheduler: Arc<dyn TimerScheduler>,
}

impl<T: Send + 'static> DelayingQueue<T> {
    /// Create a FIFO delaying queue over the given scheduler.
    pub fn new(scheduler: Arc<dyn TimerScheduler>) -> Self {
        Self::with_queue(Arc::new(BlockingQueue::new()), scheduler)
    }

    /// Compose an existing blocking queue with a scheduler.
    pub fn with_queue(queue: Arc<BlockingQueue<T>>, scheduler: Arc<dyn TimerScheduler>) -> Self {
        Self { queue, scheduler }
    }

    /// Add an element immediately. No-op after shutdown.
    pub fn push(&self, item: T) {
        self.queue.push(item);
    }

    /// Schedule `item` to be pushed after `delay`. Zero delay pushes
    /// immediately; a shut-down scheduler drops the item.
    pub fn push_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.queue.push(item);
            return;
        }
        if self.scheduler.is_shutdown() {
            return;
        }

        // The timer callback is `Fn`; the item moves through a take-once slot.
        let slot = Arc::new(Mutex::new(Some(item)));
        let queue = Arc::clone(&self.queue);
        self.scheduler.set_timer(
            delay,
            Arc::new(move || {
                if let Some(item) = slot.lock().take() {
                    queue.push(item);
                }
            }),
        );
    }

    /// Remove the next element, blocking while the queue is empty.
    /// See [`BlockingQueue::pop`] for the shutdown signaling contract.
    pub fn pop(&self) -> (Option<T>, bool) {
        self.queue.pop()
    }

    /// Number of buffered elements (excluding pending delayed pushes).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Shut down the queue and the associated scheduler. Pending delayed
    /// pushes are dropped.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        self.scheduler.shutdown();
    }

    /// Shut down both components, blocking until buffered items are drained.
    pub fn shutdown_with_drained(&self) {
        self.queue.shutdown_with_drained();
        self.scheduler.shutdown();
    }
}
