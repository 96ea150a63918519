//! Rejection policies: what happens when the task queue is saturated.
//!
//! Policies are strategy objects so they compose by wrapping one another
//! ([`SubmitAfterwards`] retries and then delegates to a fallback policy),
//! instead of nesting closures.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::PoolError;

use super::{execute_contained, Task, WorkerPool};

/// Handler receiving the message of a recovered task panic.
pub type CrashHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Context handed to a rejection policy for one saturated submission.
pub struct RejectContext<'a> {
    pool: &'a WorkerPool,
}

impl<'a> RejectContext<'a> {
    pub(crate) fn new(pool: &'a WorkerPool) -> Self {
        Self { pool }
    }

    /// Re-attempt the enqueue. On failure the task is handed back so the
    /// policy can keep retrying or delegate it.
    pub fn retry(&self, task: Task) -> Result<(), (PoolError, Task)> {
        self.pool.try_enqueue(task)
    }

    /// The pool's crash handler, for policies that execute the task
    /// themselves and must contain its panics.
    pub fn crash_handler(&self) -> CrashHandler {
        self.pool.crash_handler()
    }

    /// Current live worker count of the rejecting pool.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Current buffered task count of the rejecting pool.
    pub fn queue_size(&self) -> usize {
        self.pool.queue_size()
    }
}

/// Strategy invoked when a submission finds the task queue full.
pub trait RejectionPolicy: Send + Sync {
    /// Decide the fate of the rejected `task`. Returning `Ok(())` reports
    /// the submission as accepted to the caller.
    fn reject(&self, ctx: &RejectContext<'_>, task: Task) -> Result<(), PoolError>;
}

/// Run the rejected task on a fresh ad-hoc thread, isolated from the pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct NewProcRuns;

impl RejectionPolicy for NewProcRuns {
    fn reject(&self, ctx: &RejectContext<'_>, task: Task) -> Result<(), PoolError> {
        let handler = ctx.crash_handler();
        thread::Builder::new()
            .name("cp-reject".into())
            .spawn(move || execute_contained(task, &handler))
            .expect("failed to spawn rejection thread");
        Ok(())
    }
}

/// Execute the rejected task synchronously on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerRuns;

impl RejectionPolicy for CallerRuns {
    fn reject(&self, ctx: &RejectContext<'_>, task: Task) -> Result<(), PoolError> {
        execute_contained(task, &ctx.crash_handler());
        Ok(())
    }
}

/// Refuse the task: return [`PoolError::QueueFull`] to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct Abort;

impl RejectionPolicy for Abort {
    fn reject(&self, _ctx: &RejectContext<'_>, _task: Task) -> Result<(), PoolError> {
        Err(PoolError::QueueFull)
    }
}

/// Silently drop the task and report success.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl RejectionPolicy for Discard {
    fn reject(&self, _ctx: &RejectContext<'_>, _task: Task) -> Result<(), PoolError> {
        Ok(())
    }
}

/// Sleep and retry the submission, delegating to a fallback policy once the
/// retries are exhausted.
pub struct SubmitAfterwards {
    retries: usize,
    wait: Duration,
    fallback: Option<Box<dyn RejectionPolicy>>,
}

impl SubmitAfterwards {
    /// Retry up to `retries` times, sleeping `wait` before each attempt.
    /// Without a fallback, the last error is propagated.
    #[must_use]
    pub fn new(retries: usize, wait: Duration) -> Self {
        Self {
            retries,
            wait,
            fallback: None,
        }
    }

    /// Delegate to `fallback` once the retries are exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Box<dyn RejectionPolicy>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl RejectionPolicy for SubmitAfterwards {
    fn reject(&self, ctx: &RejectContext<'_>, mut task: Task) -> Result<(), PoolError> {
        let mut last = PoolError::QueueFull;
        for _ in 0..self.retries {
            thread::sleep(self.wait);
            match ctx.retry(task) {
                Ok(()) => return Ok(()),
                Err((PoolError::QueueFull, returned)) => {
                    last = PoolError::QueueFull;
                    task = returned;
                }
                // Shutdown and friends are not retryable.
                Err((err, _returned)) => return Err(err),
            }
        }

        match &self.fallback {
            Some(policy) => policy.reject(ctx, task),
            None => Err(last),
        }
    }
}

impl std::fmt::Debug for SubmitAfterwards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitAfterwards")
            .field("retries", &self.retries)
            .field("wait", &self.wait)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
