//! Dynamically sized worker pool with pluggable rejection policies.
//!
//! The pool is a bounded crossbeam channel serviced by worker threads. It
//! grows by one worker when submissions find a backlog and the pool is below
//! its maximum, and shrinks when a surplus worker sits idle past its
//! keep-alive. Saturation is delegated to a [`RejectionPolicy`] strategy
//! object, so backpressure behavior composes without touching the pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use chronopool::config::WorkerPoolConfig;
//! use chronopool::pool::WorkerPool;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_max_workers(4))?;
//! pool.start()?;
//! pool.submit(|| println!("ran on a pool worker"))?;
//! pool.shutdown_wait(true);
//! ```

pub mod reject;

use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::WorkerPoolConfig;
use crate::error::PoolError;
use crate::timer::trigger::panic_message;

pub use reject::{
    Abort, CallerRuns, CrashHandler, Discard, NewProcRuns, RejectContext, RejectionPolicy,
    SubmitAfterwards,
};

/// A unit of work submitted to the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue backlog beyond which a submission grows the pool by one worker.
const GROWTH_BACKLOG: usize = 3;

/// Channel capacities below this are raised to it.
const MIN_QUEUE_CAPACITY: usize = 64;

/// Worker pool lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    /// Constructed but not started.
    Init = 0,
    /// Accepting and executing tasks.
    Running = 1,
    /// Shutting down; workers finish the buffered tasks first.
    Draining = 2,
    /// Terminal state; no tasks accepted, no workers spawned.
    Shutdown = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Shutdown,
        }
    }
}

/// State shared between the pool handle and its worker threads.
struct PoolShared {
    state: AtomicU8,
    worker_count: AtomicUsize,
    next_worker_id: AtomicUsize,
    min_workers: usize,
    keep_alive: Duration,
    crash_handler: RwLock<CrashHandler>,
}

impl PoolShared {
    fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn store_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn crash_handler(&self) -> CrashHandler {
        Arc::clone(&self.crash_handler.read())
    }
}

/// A channel-backed task queue serviced by a dynamically sized set of worker
/// threads.
///
/// State machine: `Init -> Running -> Draining|Shutdown`. The worker count
/// stays within `[min_workers, max_workers]` while running; growth is
/// serialized under a dedicated mutex so a submission burst cannot
/// over-provision. Every executed task is panic-contained; a recovered panic
/// is routed to the crash handler and never kills the worker.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    shared: Arc<PoolShared>,
    task_tx: Mutex<Option<Sender<Task>>>,
    task_rx: Receiver<Task>,
    growth_lock: Mutex<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    policy: Box<dyn RejectionPolicy>,
}

impl WorkerPool {
    /// Create a pool with the given configuration and the [`Abort`]
    /// rejection policy.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] on invalid sizing
    /// (`min_workers > max_workers`, zero `max_workers`).
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let capacity = config.queue_capacity.max(MIN_QUEUE_CAPACITY);
        let (task_tx, task_rx) = bounded(capacity);

        let shared = Arc::new(PoolShared {
            state: AtomicU8::new(PoolState::Init as u8),
            worker_count: AtomicUsize::new(0),
            next_worker_id: AtomicUsize::new(0),
            min_workers: config.min_workers,
            keep_alive: config.keep_alive(),
            crash_handler: RwLock::new(default_crash_handler()),
        });

        Ok(Self {
            config,
            shared,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            growth_lock: Mutex::new(()),
            handles: Mutex::new(Vec::new()),
            policy: Box::new(Abort),
        })
    }

    /// Replace the rejection policy invoked when the queue is saturated.
    #[must_use]
    pub fn with_rejection_policy(mut self, policy: Box<dyn RejectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the crash handler that receives recovered task panics.
    #[must_use]
    pub fn with_crash_handler(self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        *self.shared.crash_handler.write() = Arc::new(handler);
        self
    }

    /// Transition `Init -> Running` and spawn `min_workers` workers.
    ///
    /// Calling `start` on a pool that is already running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidState`] when the pool is draining or
    /// shut down.
    pub fn start(&self) -> Result<(), PoolError> {
        match self.shared.state.compare_exchange(
            PoolState::Init as u8,
            PoolState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                info!(
                    min_workers = self.config.min_workers,
                    max_workers = self.config.max_workers,
                    "worker pool started"
                );
                for _ in 0..self.config.min_workers {
                    self.spawn_worker();
                }
                Ok(())
            }
            Err(current) if current == PoolState::Running as u8 => Ok(()),
            Err(_) => Err(PoolError::InvalidState),
        }
    }

    /// Enqueue a task for execution on a pool worker.
    ///
    /// A submission that finds more than a small backlog grows the pool by
    /// one worker (up to `max_workers`). A full queue is delegated to the
    /// configured rejection policy.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PoolShutdown`] when the pool is not running
    /// - whatever the rejection policy returns on saturation
    ///   ([`PoolError::QueueFull`] under the default [`Abort`] policy)
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), PoolError> {
        self.submit_boxed(Box::new(task))
    }

    /// Enqueue an already-boxed task. See [`WorkerPool::submit`].
    pub fn submit_boxed(&self, task: Task) -> Result<(), PoolError> {
        if self.shared.state() != PoolState::Running {
            return Err(PoolError::PoolShutdown);
        }

        if self.task_rx.len() > GROWTH_BACKLOG
            && self.shared.worker_count.load(Ordering::Acquire) < self.config.max_workers
        {
            let _guard = self.growth_lock.lock();
            if self.shared.worker_count.load(Ordering::Acquire) < self.config.max_workers {
                self.spawn_worker();
            }
        }

        match self.try_enqueue(task) {
            Ok(()) => Ok(()),
            Err((PoolError::QueueFull, task)) => {
                let ctx = RejectContext::new(self);
                self.policy.reject(&ctx, task)
            }
            Err((err, _task)) => Err(err),
        }
    }

    /// Attempt a non-blocking enqueue, handing the task back on failure.
    pub(crate) fn try_enqueue(&self, task: Task) -> Result<(), (PoolError, Task)> {
        if self.shared.state() != PoolState::Running {
            return Err((PoolError::PoolShutdown, task));
        }
        let guard = self.task_tx.lock();
        let Some(task_tx) = guard.as_ref() else {
            return Err((PoolError::PoolShutdown, task));
        };
        match task_tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) => Err((PoolError::QueueFull, task)),
            Err(TrySendError::Disconnected(task)) => Err((PoolError::PoolShutdown, task)),
        }
    }

    /// Current number of live workers.
    pub fn worker_count(&self) -> usize {
        self.shared.worker_count.load(Ordering::Acquire)
    }

    /// Number of buffered tasks waiting for a worker.
    pub fn queue_size(&self) -> usize {
        self.task_rx.len()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub(crate) fn crash_handler(&self) -> CrashHandler {
        self.shared.crash_handler()
    }

    /// Begin shutdown. With `drain`, workers finish every buffered task
    /// before exiting; without it, buffered tasks are discarded and workers
    /// exit as soon as they observe the state change. Only meaningful from
    /// `Running`; otherwise a no-op.
    pub fn shutdown(&self, drain: bool) {
        let target = if drain {
            PoolState::Draining
        } else {
            PoolState::Shutdown
        };
        if self
            .shared
            .state
            .compare_exchange(
                PoolState::Running as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        info!(drain, "shutting down worker pool");
        // Closing the channel: workers observe Disconnected once the
        // buffer is empty.
        *self.task_tx.lock() = None;
    }

    /// [`shutdown`](WorkerPool::shutdown), then block until every worker
    /// thread has exited.
    pub fn shutdown_wait(&self, drain: bool) {
        self.shutdown(drain);

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let worker_count = handles.len();
        for handle in handles {
            let _ = handle.join();
        }
        info!(worker_count, "worker pool shut down complete");
    }

    fn spawn_worker(&self) {
        let shared = Arc::clone(&self.shared);
        let task_rx = self.task_rx.clone();
        let worker_id = shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
        shared.worker_count.fetch_add(1, Ordering::AcqRel);

        let handle = thread::Builder::new()
            .name(format!("cp-worker-{worker_id}"))
            .spawn(move || worker_loop(&shared, &task_rx, worker_id))
            .expect("failed to spawn worker thread");
        let mut handles = self.handles.lock();
        // Reap workers that already exited on idle, so grow/shrink cycles
        // do not accumulate dead handles.
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but do not join; explicit shutdown_wait is
        // required for graceful cleanup.
        if self.shared.state() != PoolState::Shutdown {
            self.shared.store_state(PoolState::Shutdown);
            *self.task_tx.lock() = None;
            debug!("worker pool dropped without explicit shutdown; workers will exit on their own");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("worker_count", &self.worker_count())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

fn worker_loop(shared: &Arc<PoolShared>, task_rx: &Receiver<Task>, worker_id: usize) {
    debug!(worker_id, "worker thread started");
    let mut shrunk = false;
    loop {
        if shared.state() == PoolState::Shutdown {
            break;
        }

        match task_rx.recv_timeout(shared.keep_alive) {
            Ok(task) => {
                if shared.state() == PoolState::Shutdown {
                    // Discarded: non-drain shutdown guarantees no new
                    // tasks start.
                    break;
                }
                execute_contained(task, &shared.crash_handler());
            }
            Err(RecvTimeoutError::Timeout) => {
                // Idle past keep-alive; surplus workers exit. The CAS
                // keeps concurrent timeouts from shrinking below min.
                let count = shared.worker_count.load(Ordering::Acquire);
                if count > shared.min_workers
                    && shared
                        .worker_count
                        .compare_exchange(count, count - 1, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                {
                    debug!(worker_id, "idle worker exiting");
                    shrunk = true;
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Channel closed and drained.
                shared.store_state(PoolState::Shutdown);
                break;
            }
        }
    }
    if !shrunk {
        shared.worker_count.fetch_sub(1, Ordering::AcqRel);
    }
    debug!(worker_id, "worker thread exiting");
}

/// Run a task with panic containment, routing recovered panics to the
/// crash handler.
pub(crate) fn execute_contained(task: Task, handler: &CrashHandler) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || task())) {
        handler(&panic_message(payload.as_ref()));
    }
}

fn default_crash_handler() -> CrashHandler {
    Arc::new(|message: &str| {
        error!(
            panic = message,
            backtrace = %Backtrace::force_capture(),
            "worker task panicked"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    #[test]
    fn test_grow_shrink_cycles_do_not_accumulate_handles() {
        let pool = WorkerPool::new(
            WorkerPoolConfig::new()
                .with_min_workers(1)
                .with_max_workers(3)
                .with_queue_capacity(64)
                .with_keep_alive(Duration::from_millis(50)),
        )
        .unwrap();
        pool.start().unwrap();

        for _ in 0..3 {
            let open = Arc::new(AtomicBool::new(false));
            // Enough parked tasks to hold a backlog and grow to max.
            for _ in 0..12 {
                let open = Arc::clone(&open);
                pool.submit(move || {
                    while !open.load(Ordering::Acquire) {
                        thread::sleep(Duration::from_millis(2));
                    }
                })
                .unwrap();
            }
            assert!(wait_until(Duration::from_secs(3), || pool.worker_count() == 3));

            open.store(true, Ordering::Release);
            assert!(wait_until(Duration::from_secs(3), || {
                pool.queue_size() == 0 && pool.worker_count() == 1
            }));
        }

        // Spawns reap exited workers, so the handle list stays bounded by
        // the maximum instead of growing with every cycle.
        assert!(pool.handles.lock().len() <= 3);
        pool.shutdown_wait(false);
    }
}
