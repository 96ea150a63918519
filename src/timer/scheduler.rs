//! The heap timer: a coordinating thread that owns every pending entry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{at, bounded, never, select, Receiver, Sender};
use tracing::{debug, error, info};

use crate::collection::{PriorityQueue, Queue};
use crate::config::TimerConfig;
use crate::error::PoolError;

use super::entry::{EntryState, ModRequest, TimerCallback, TimerEntry};
use super::trigger::{panic_message, Trigger};
use super::{send_nonblocking, ExecStrategy, Ticker, Timer, TimerScheduler};

/// Timer/ticker scheduler backed by a single-owner binary heap.
///
/// One coordinating thread owns the heap of pending entries and multiplexes
/// over four channels: the next trigger deadline, adds, resets, and removals.
/// Callers never touch the heap; they only send messages, and the sends never
/// block (a full channel spills into a helper thread).
///
/// Construction picks the callback execution strategy:
///
/// - [`HeapTimer::pooled`] — a lazily started fixed worker set
/// - [`HeapTimer::asynchronous`] — one ad-hoc thread per fire
/// - [`HeapTimer::synchronous`] — inline on the coordinating thread
pub struct HeapTimer {
    add_tx: Sender<TimerEntry>,
    mod_tx: Sender<ModRequest>,
    remove_tx: Sender<Arc<EntryState>>,
    shutdown_tx: Sender<()>,
    shutdown: Arc<AtomicBool>,
}

/// Receiving side of the scheduler mailbox, owned by the coordinating thread.
struct Mailbox {
    add_rx: Receiver<TimerEntry>,
    mod_rx: Receiver<ModRequest>,
    remove_rx: Receiver<Arc<EntryState>>,
    shutdown_rx: Receiver<()>,
    trigger: Trigger,
}

impl HeapTimer {
    /// Scheduler whose callbacks run on a fixed set of `workers` background
    /// threads, started lazily on the first fire.
    #[must_use]
    pub fn pooled(workers: usize) -> Self {
        Self::spawn(ExecStrategy::Pooled(workers), TimerConfig::default())
    }

    /// Scheduler that spawns one ad-hoc thread per firing callback.
    #[must_use]
    pub fn asynchronous() -> Self {
        Self::spawn(ExecStrategy::Async, TimerConfig::default())
    }

    /// Scheduler that runs callbacks inline on the coordinating thread.
    /// Only suitable for callbacks that finish immediately; a slow callback
    /// delays all other timers.
    #[must_use]
    pub fn synchronous() -> Self {
        Self::spawn(ExecStrategy::Sync, TimerConfig::default())
    }

    /// Scheduler with explicit strategy and channel capacities.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] when a channel capacity is zero;
    /// a rendezvous mailbox would force every send into a spill thread.
    pub fn with_config(strategy: ExecStrategy, config: TimerConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        Ok(Self::spawn(strategy, config))
    }

    fn spawn(strategy: ExecStrategy, config: TimerConfig) -> Self {
        let (add_tx, add_rx) = bounded(config.channel_capacity);
        let (mod_tx, mod_rx) = bounded(config.channel_capacity);
        let (remove_tx, remove_rx) = bounded(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let mailbox = Mailbox {
            add_rx,
            mod_rx,
            remove_rx,
            shutdown_rx,
            trigger: Trigger::new(strategy, config.trigger_queue_capacity),
        };

        thread::Builder::new()
            .name("cp-timer".into())
            .spawn(move || coordinate(&mailbox))
            .expect("failed to spawn timer coordinating thread");

        Self {
            add_tx,
            mod_tx,
            remove_tx,
            shutdown_tx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Schedule a one-shot callback after `duration`.
    ///
    /// Zero duration fires as soon as the coordinating thread observes the
    /// entry. After shutdown this returns an inert handle and schedules
    /// nothing.
    pub fn set_timer(&self, duration: Duration, callback: impl Fn() + Send + Sync + 'static) -> Timer {
        TimerScheduler::set_timer(self, duration, Arc::new(callback))
    }

    /// Schedule a repeating callback every `duration`.
    ///
    /// # Panics
    ///
    /// Panics on a zero interval; it would spin the coordinating thread.
    pub fn set_ticker(&self, duration: Duration, callback: impl Fn() + Send + Sync + 'static) -> Ticker {
        TimerScheduler::set_ticker(self, duration, Arc::new(callback))
    }

    fn schedule(&self, duration: Duration, callback: TimerCallback, repeating: bool) -> Arc<EntryState> {
        let state = Arc::new(EntryState::new());
        if self.shutdown.load(Ordering::Acquire) {
            return state;
        }
        let entry = TimerEntry {
            trigger: Instant::now() + duration,
            interval: duration,
            repeating,
            generation: state.generation(),
            state: Arc::clone(&state),
            callback,
        };
        send_nonblocking(&self.add_tx, entry);
        state
    }
}

impl TimerScheduler for HeapTimer {
    fn set_timer(&self, duration: Duration, callback: TimerCallback) -> Timer {
        let state = self.schedule(duration, Arc::clone(&callback), false);
        Timer::new(state, callback, self.mod_tx.clone(), self.remove_tx.clone())
    }

    fn set_ticker(&self, duration: Duration, callback: TimerCallback) -> Ticker {
        assert!(!duration.is_zero(), "ticker interval must be non-zero");
        let state = self.schedule(duration, callback, true);
        Ticker::new(state, self.remove_tx.clone())
    }

    fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down timer scheduler");
        let _ = self.shutdown_tx.try_send(());
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Drop for HeapTimer {
    fn drop(&mut self) {
        // Stop the coordinating thread; pending entries are discarded.
        TimerScheduler::shutdown(self);
    }
}

impl std::fmt::Debug for HeapTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapTimer")
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Entry point of the coordinating thread. The tick loop is wrapped in panic
/// isolation: an unexpected failure is logged and the loop restarts with the
/// heap intact, rather than terminating the scheduler.
fn coordinate(mailbox: &Mailbox) {
    let mut timers: PriorityQueue<TimerEntry> =
        PriorityQueue::new(|a: &TimerEntry, b: &TimerEntry| a.trigger < b.trigger);

    loop {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| tick_loop(&mut timers, mailbox)));
        match outcome {
            Ok(()) => break,
            Err(payload) => {
                error!(
                    panic = %panic_message(&payload),
                    "timer coordinating loop panicked, restarting"
                );
            }
        }
    }
    debug!("timer coordinating thread exiting");
}

/// The multiplexed wait loop. Returns on shutdown or when every handle and
/// the owning `HeapTimer` are gone.
fn tick_loop(timers: &mut PriorityQueue<TimerEntry>, mailbox: &Mailbox) {
    loop {
        // Shutdown wins over any other ready message.
        if mailbox.shutdown_rx.try_recv().is_ok() {
            return;
        }

        let now = Instant::now();
        // Fire everything due. Tombstoned or superseded entries are
        // discarded here, which is also what garbage-collects them.
        while let Some(top) = timers.peek() {
            if top.trigger > now {
                break;
            }
            let Some(entry) = timers.pop() else { break };
            if !entry.is_live() {
                continue;
            }
            mailbox.trigger.fire(Arc::clone(&entry.callback));
            if entry.repeating {
                let mut entry = entry;
                entry.trigger = now + entry.interval;
                timers.push(entry);
            }
        }

        let deadline = match timers.peek() {
            Some(top) => at(top.trigger),
            None => never(),
        };

        select! {
            recv(mailbox.add_rx) -> msg => {
                let Ok(entry) = msg else { return };
                ingest(timers, entry, mailbox);
                // Drain the burst in one pass before recomputing the
                // deadline, to avoid heap churn under load.
                while let Ok(entry) = mailbox.add_rx.try_recv() {
                    ingest(timers, entry, mailbox);
                }
            }
            recv(mailbox.mod_rx) -> msg => {
                let Ok(req) = msg else { return };
                let generation = req.state.bump_generation();
                timers.push(TimerEntry {
                    trigger: Instant::now() + req.duration,
                    interval: req.duration,
                    repeating: false,
                    generation,
                    state: req.state,
                    callback: req.callback,
                });
            }
            recv(mailbox.remove_rx) -> msg => {
                let Ok(state) = msg else { return };
                state.cancel();
            }
            recv(mailbox.shutdown_rx) -> _ => {
                return;
            }
            recv(deadline) -> _ => {}
        }
    }
}

/// Insert a newly added entry, firing immediately if it is already due.
fn ingest(timers: &mut PriorityQueue<TimerEntry>, entry: TimerEntry, mailbox: &Mailbox) {
    if entry.trigger <= Instant::now() {
        if !entry.is_live() {
            return;
        }
        mailbox.trigger.fire(Arc::clone(&entry.callback));
        if entry.repeating {
            let mut entry = entry;
            entry.trigger = Instant::now() + entry.interval;
            timers.push(entry);
        }
    } else {
        timers.push(entry);
    }
}
