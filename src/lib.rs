//! # Chronopool
//!
//! A thread-based concurrency toolkit: heap-timer scheduling, dynamically
//! sized worker pools, and blocking queue primitives.
//!
//! The centerpiece is a timer scheduler whose binary heap of pending timers is
//! owned by a single coordinating thread. All mutation — adding a timer,
//! resetting it, cancelling it — travels over bounded channels, so the heap
//! never needs a lock and callers never block.
//!
//! ## Key Features
//!
//! - **Lock-free timer heap**: One coordinating thread owns the heap; other
//!   threads communicate through a mailbox of add/modify/remove channels
//! - **Pluggable callback execution**: Fire callbacks on a fixed worker set,
//!   on an ad-hoc thread per fire, or synchronously on the coordinating thread
//! - **Dynamic worker pool**: Grows under backlog up to a configured maximum,
//!   shrinks when workers sit idle, and drains or aborts on shutdown
//! - **Composable backpressure**: Rejection policies are strategy objects that
//!   can wrap one another (retry-with-backoff falling back to abort, etc.)
//! - **Blocking and delaying queues**: Condvar-guarded FIFO with cooperative
//!   shutdown, plus deferred enqueue built on the timer scheduler
//! - **Expiring map**: Concurrent key-value store with per-entry TTL, swept
//!   by a scheduler ticker and lazily on reads
//!
//! ## Timer scheduling
//!
//! ```rust,ignore
//! use chronopool::timer::HeapTimer;
//! use std::time::Duration;
//!
//! let scheduler = HeapTimer::pooled(4);
//!
//! let timer = scheduler.set_timer(Duration::from_millis(50), || {
//!     println!("fired once");
//! });
//! timer.reset(Duration::from_millis(100)); // re-arm before it fires
//!
//! let ticker = scheduler.set_ticker(Duration::from_secs(1), || {
//!     println!("fired every second");
//! });
//! ticker.stop();
//! scheduler.shutdown();
//! ```
//!
//! ## Worker pool
//!
//! ```rust,ignore
//! use chronopool::config::WorkerPoolConfig;
//! use chronopool::pool::{SubmitAfterwards, WorkerPool};
//! use std::time::Duration;
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new()
//!         .with_min_workers(1)
//!         .with_max_workers(4)
//!         .with_queue_capacity(256),
//! )?
//! .with_rejection_policy(Box::new(SubmitAfterwards::new(3, Duration::from_millis(10))));
//!
//! pool.start()?;
//! pool.submit(|| heavy_work())?;
//! pool.shutdown_wait(true); // drain buffered tasks, then join workers
//! ```
//!
//! For complete examples, see the integration tests under `tests/`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Generic queue containers plus blocking and delaying queues.
pub mod collection;
/// Configuration models for pools and the timer scheduler.
pub mod config;
/// Error taxonomy for pool and queue operations.
pub mod error;
/// Dynamically sized worker pool with pluggable rejection policies.
pub mod pool;
/// Heap-based timer/ticker scheduler.
pub mod timer;
/// Shared utilities.
pub mod util;

pub use collection::{
    BlockingQueue, DelayingQueue, ExpirationMap, FifoQueue, PriorityQueue, Queue, Stack,
};
pub use error::{AppResult, PoolError};
pub use pool::{Task, WorkerPool};
pub use timer::{ExecStrategy, HeapTimer, Ticker, Timer, TimerScheduler};
