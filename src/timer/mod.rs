//! Heap-based timer/ticker scheduler.
//!
//! A single coordinating thread owns a min-heap of pending entries ordered by
//! trigger instant. Every mutation — add, reset, cancel — is a message on a
//! bounded channel, so the heap needs no lock and no caller ever blocks on
//! the scheduler. Callback execution is delegated to a strategy chosen at
//! construction (see [`ExecStrategy`]).

pub mod entry;
pub mod scheduler;
pub mod trigger;

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};

pub use entry::{Ticker, Timer, TimerCallback};
pub use scheduler::HeapTimer;
pub use trigger::ExecStrategy;

/// The scheduling capability exposed by [`HeapTimer`].
///
/// The trait is object-safe so consumers (the delaying queue, transport
/// layers) can hold an `Arc<dyn TimerScheduler>` without caring which
/// execution strategy backs it.
pub trait TimerScheduler: Send + Sync {
    /// Schedule a one-shot callback after `duration`. Zero fires as soon as
    /// the coordinating thread observes the entry.
    fn set_timer(&self, duration: Duration, callback: TimerCallback) -> Timer;

    /// Schedule a repeating callback every `duration`, re-armed immediately
    /// after each fire.
    ///
    /// # Panics
    ///
    /// Panics on a zero interval; it would spin the coordinating thread.
    fn set_ticker(&self, duration: Duration, callback: TimerCallback) -> Ticker;

    /// Stop the coordinating thread. Subsequent scheduling calls return
    /// inert handles and do nothing. Idempotent.
    fn shutdown(&self);

    /// Whether the scheduler has been shut down.
    fn is_shutdown(&self) -> bool;
}

/// Send a message without ever blocking the calling thread.
///
/// A full channel spills into a helper thread that performs the blocking
/// send; a disconnected channel (scheduler already gone) drops the message.
pub(crate) fn send_nonblocking<T: Send + 'static>(tx: &Sender<T>, msg: T) {
    match tx.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(msg)) => {
            let tx = tx.clone();
            thread::spawn(move || {
                let _ = tx.send(msg);
            });
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}
