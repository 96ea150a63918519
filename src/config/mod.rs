//! Configuration models for pools and the timer scheduler.

pub mod pool;

pub use pool::{TimerConfig, ToolkitConfig, WorkerPoolConfig};
