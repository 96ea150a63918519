//! Pool and scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Workers kept alive even when idle.
    pub min_workers: usize,
    /// Upper bound on concurrently running workers.
    pub max_workers: usize,
    /// Buffered task queue capacity. Values below 64 are raised to 64.
    pub queue_capacity: usize,
    /// How long a surplus worker may sit idle before exiting, in milliseconds.
    pub keep_alive_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: num_cpus::get(),
            queue_capacity: 256,
            keep_alive_ms: 300_000,
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with defaults (`min_workers = 1`,
    /// `max_workers =` number of CPUs, five-minute keep-alive).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum worker count.
    #[must_use]
    pub fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    /// Set the maximum worker count.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the task queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the idle keep-alive for surplus workers.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = keep_alive.as_millis() as u64;
        self
    }

    /// Idle keep-alive as a [`Duration`].
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Validate pool sizing values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.min_workers > self.max_workers {
            return Err(format!(
                "min_workers ({}) must not exceed max_workers ({})",
                self.min_workers, self.max_workers
            ));
        }
        if self.keep_alive_ms == 0 {
            return Err("keep_alive_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Timer scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Capacity of each mailbox channel (add/modify/remove).
    pub channel_capacity: usize,
    /// Capacity of the pooled trigger strategy's callback queue.
    pub trigger_queue_capacity: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            trigger_queue_capacity: 1024,
        }
    }
}

impl TimerConfig {
    /// Create a configuration with default channel capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate channel capacities.
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be greater than 0".into());
        }
        if self.trigger_queue_capacity == 0 {
            return Err("trigger_queue_capacity must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root toolkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Worker pool configuration.
    pub pool: WorkerPoolConfig,
    /// Timer scheduler configuration.
    pub timer: TimerConfig,
}

impl ToolkitConfig {
    /// Validate all component configurations.
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate().map_err(|e| format!("pool invalid: {e}"))?;
        self.timer
            .validate()
            .map_err(|e| format!("timer invalid: {e}"))?;
        Ok(())
    }

    /// Parse toolkit configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: ToolkitConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(WorkerPoolConfig::default().validate().is_ok());
        assert!(TimerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_min_exceeding_max_rejected() {
        let cfg = WorkerPoolConfig::new().with_min_workers(8).with_max_workers(2);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_max_workers_rejected() {
        let cfg = WorkerPoolConfig::new().with_min_workers(0).with_max_workers(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_str() {
        let input = r#"{
            "pool": {
                "min_workers": 2,
                "max_workers": 8,
                "queue_capacity": 128,
                "keep_alive_ms": 60000
            },
            "timer": {
                "channel_capacity": 512,
                "trigger_queue_capacity": 512
            }
        }"#;
        let cfg = ToolkitConfig::from_json_str(input).unwrap();
        assert_eq!(cfg.pool.min_workers, 2);
        assert_eq!(cfg.pool.keep_alive(), Duration::from_secs(60));
        assert_eq!(cfg.timer.channel_capacity, 512);
    }

    #[test]
    fn test_from_json_str_invalid_sizing() {
        let input = r#"{
            "pool": {
                "min_workers": 9,
                "max_workers": 1,
                "queue_capacity": 128,
                "keep_alive_ms": 60000
            },
            "timer": {
                "channel_capacity": 512,
                "trigger_queue_capacity": 512
            }
        }"#;
        assert!(ToolkitConfig::from_json_str(input).is_err());
    }
}
