//! Error types for pool and scheduler operations.

use thiserror::Error;

/// Errors produced by the worker pool.
///
/// Contract violations (invalid sizing) surface as [`PoolError::InvalidConfig`]
/// at construction; operational rejections (`QueueFull`, `PoolShutdown`) are
/// recoverable and may be absorbed by a rejection policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The task queue is full; no more tasks can be accepted.
    #[error("task queue is full")]
    QueueFull,
    /// The pool is not running (never started, draining, or shut down).
    #[error("worker pool has been shut down")]
    PoolShutdown,
    /// The operation is not valid in the pool's current state.
    #[error("worker pool state is invalid for this operation")]
    InvalidState,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
