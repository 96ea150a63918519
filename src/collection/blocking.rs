//! Condvar-guarded blocking queue with cooperative shutdown.

use parking_lot::{Condvar, Mutex};

use super::queue::{FifoQueue, Queue};

struct Shared<T> {
    queue: Box<dyn Queue<T> + Send>,
    shutdown: bool,
}

/// A blocking queue: `pop` parks the calling thread while the queue is empty.
///
/// Shutdown is cooperative. After [`shutdown`](BlockingQueue::shutdown),
/// `push` becomes a no-op and blocked poppers wake up; they keep draining
/// whatever is buffered and then observe termination as `(None, true)`.
/// [`shutdown_with_drained`](BlockingQueue::shutdown_with_drained) additionally
/// blocks the shutting-down thread until consumers have emptied the queue.
///
/// The backing container is pluggable: pass a
/// [`PriorityQueue`](super::PriorityQueue) to get a blocking priority queue.
pub struct BlockingQueue<T> {
    inner: Mutex<Shared<T>>,
    not_empty: Condvar,
    drained: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create a FIFO blocking queue.
    #[must_use]
    pub fn new() -> Self
    where
        T: Send + 'static,
    {
        Self::with_queue(Box::new(FifoQueue::new()))
    }

    /// Create a blocking queue over a caller-supplied container.
    #[must_use]
    pub fn with_queue(queue: Box<dyn Queue<T> + Send>) -> Self {
        Self {
            inner: Mutex::new(Shared {
                queue,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Add an element and wake one blocked popper. No-op after shutdown.
    pub fn push(&self, item: T) {
        let mut shared = self.inner.lock();
        if shared.shutdown {
            return;
        }
        shared.queue.push(item);
        self.not_empty.notify_one();
    }

    /// Remove the next element, blocking while the queue is empty.
    ///
    /// Returns `(None, true)` once the queue is shut down and empty. While
    /// draining after shutdown, buffered items are still returned, paired
    /// with `true` so consumers can tell termination is underway.
    pub fn pop(&self) -> (Option<T>, bool) {
        let mut shared = self.inner.lock();
        while shared.queue.is_empty() && !shared.shutdown {
            self.not_empty.wait(&mut shared);
        }

        if shared.queue.is_empty() {
            return (None, true);
        }

        let item = shared.queue.pop();
        if shared.queue.is_empty() {
            self.drained.notify_all();
        }
        (item, shared.shutdown)
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Whether the queue has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    /// Stop accepting pushes and wake every blocked popper.
    pub fn shutdown(&self) {
        let mut shared = self.inner.lock();
        shared.shutdown = true;
        self.not_empty.notify_all();
    }

    /// Shut down, then block until consumers have drained all buffered items.
    pub fn shutdown_with_drained(&self) {
        let mut shared = self.inner.lock();
        shared.shutdown = true;
        self.not_empty.notify_all();
        while !shared.queue.is_empty() {
            self.drained.wait(&mut shared);
        }
    }
}

impl<T: Send + 'static> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
