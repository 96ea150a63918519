//! Callback execution strategies for the timer scheduler.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Once;
use tracing::error;

use super::entry::TimerCallback;

/// How the scheduler executes firing callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStrategy {
    /// Push callbacks into a bounded queue serviced by a fixed set of
    /// background workers, established lazily on the first fire. A full
    /// queue spills into a fire-and-forget thread so the coordinating
    /// thread never blocks.
    Pooled(usize),
    /// Run each firing callback on its own ad-hoc thread.
    Async,
    /// Run the callback directly on the coordinating thread. Only for
    /// callbacks guaranteed to be fast and non-blocking; a slow callback
    /// delays every other timer.
    Sync,
}

/// Run a callback with panic containment. A panicking callback is reported
/// and swallowed; it must never take down the thread that fired it.
pub(crate) fn run_contained(callback: &TimerCallback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        error!(panic = %panic_message(&payload), "timer callback panicked");
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Execution strategy instance owned by the coordinating thread.
pub(crate) enum Trigger {
    Pooled {
        workers: usize,
        once: Once,
        tx: Sender<TimerCallback>,
        rx: Receiver<TimerCallback>,
    },
    Async,
    Sync,
}

impl Trigger {
    pub(crate) fn new(strategy: ExecStrategy, queue_capacity: usize) -> Self {
        match strategy {
            ExecStrategy::Pooled(workers) => {
                let (tx, rx) = bounded(queue_capacity);
                Self::Pooled {
                    workers: workers.max(1),
                    once: Once::new(),
                    tx,
                    rx,
                }
            }
            ExecStrategy::Async => Self::Async,
            ExecStrategy::Sync => Self::Sync,
        }
    }

    /// Fire a callback according to the strategy. Never blocks the caller.
    pub(crate) fn fire(&self, callback: TimerCallback) {
        match self {
            Self::Pooled {
                workers,
                once,
                tx,
                rx,
            } => {
                once.call_once(|| spawn_trigger_workers(*workers, rx));
                match tx.try_send(callback) {
                    Ok(()) => {}
                    Err(TrySendError::Full(callback)) => {
                        // Spill so the coordinating thread keeps ticking.
                        let tx = tx.clone();
                        thread::spawn(move || {
                            let _ = tx.send(callback);
                        });
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                }
            }
            Self::Async => {
                thread::spawn(move || run_contained(&callback));
            }
            Self::Sync => run_contained(&callback),
        }
    }
}

fn spawn_trigger_workers(workers: usize, rx: &Receiver<TimerCallback>) {
    for id in 0..workers {
        let rx = rx.clone();
        thread::Builder::new()
            .name(format!("cp-trigger-{id}"))
            .spawn(move || {
                // Exits when the scheduler drops its sender.
                while let Ok(callback) = rx.recv() {
                    run_contained(&callback);
                }
            })
            .expect("failed to spawn trigger worker thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_sync_trigger_contains_panics() {
        let trigger = Trigger::new(ExecStrategy::Sync, 16);
        trigger.fire(Arc::new(|| panic!("boom")));
        // Still usable after a panicking callback.
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        trigger.fire(Arc::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pooled_trigger_executes() {
        let trigger = Trigger::new(ExecStrategy::Pooled(2), 16);
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let count = Arc::clone(&count);
            trigger.fire(Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while count.load(Ordering::SeqCst) < 8 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
