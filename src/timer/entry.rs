//! Timer entries, tombstone state, and the user-facing handles.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use super::send_nonblocking;

/// Callback invoked when a timer or ticker fires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Shared tombstone state between a handle and its heap entries.
///
/// `cancelled` is the removal tombstone. `generation` invalidates superseded
/// heap entries: a reset bumps it and inserts a fresh entry, so an older
/// entry popped later no longer matches and is discarded without firing.
/// Both fields are written only by the coordinating thread; handles merely
/// request changes over the command channels.
#[derive(Debug, Default)]
pub(crate) struct EntryState {
    cancelled: AtomicBool,
    generation: AtomicU64,
}

impl EntryState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate all existing heap entries and return the new generation.
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// A pending entry in the scheduler's heap. Owned exclusively by the
/// coordinating thread; external code only holds the shared `EntryState`.
pub(crate) struct TimerEntry {
    pub(crate) trigger: Instant,
    pub(crate) interval: Duration,
    pub(crate) repeating: bool,
    pub(crate) generation: u64,
    pub(crate) state: Arc<EntryState>,
    pub(crate) callback: TimerCallback,
}

impl TimerEntry {
    /// Whether this entry should still fire when popped.
    pub(crate) fn is_live(&self) -> bool {
        !self.state.is_cancelled() && self.generation == self.state.generation()
    }
}

/// Reset request: tombstone the old heap entry, insert a fresh one.
pub(crate) struct ModRequest {
    pub(crate) state: Arc<EntryState>,
    pub(crate) callback: TimerCallback,
    pub(crate) duration: Duration,
}

/// Handle for a one-shot timer.
///
/// Dropping the handle does not cancel the timer; the entry is garbage once
/// it fires. `stop` is only needed to prevent the callback from running.
pub struct Timer {
    state: Arc<EntryState>,
    callback: TimerCallback,
    mod_tx: Sender<ModRequest>,
    remove_tx: Sender<Arc<EntryState>>,
}

impl Timer {
    pub(crate) fn new(
        state: Arc<EntryState>,
        callback: TimerCallback,
        mod_tx: Sender<ModRequest>,
        remove_tx: Sender<Arc<EntryState>>,
    ) -> Self {
        Self {
            state,
            callback,
            mod_tx,
            remove_tx,
        }
    }

    /// Cancel the timer. Best-effort: a no-op if it already fired.
    pub fn stop(&self) {
        send_nonblocking(&self.remove_tx, Arc::clone(&self.state));
    }

    /// Re-arm the timer to fire after `duration` from now, superseding the
    /// currently scheduled trigger.
    pub fn reset(&self, duration: Duration) {
        send_nonblocking(
            &self.mod_tx,
            ModRequest {
                state: Arc::clone(&self.state),
                callback: Arc::clone(&self.callback),
                duration,
            },
        );
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("cancelled", &self.state.is_cancelled())
            .finish()
    }
}

/// Handle for a repeating ticker.
///
/// Unlike a one-shot timer, a ticker re-arms itself forever; `stop` is the
/// only way to end it.
pub struct Ticker {
    state: Arc<EntryState>,
    remove_tx: Sender<Arc<EntryState>>,
}

impl Ticker {
    pub(crate) fn new(state: Arc<EntryState>, remove_tx: Sender<Arc<EntryState>>) -> Self {
        Self { state, remove_tx }
    }

    /// Cancel the ticker. No further fires occur once the coordinating
    /// thread processes the tombstone.
    pub fn stop(&self) {
        send_nonblocking(&self.remove_tx, Arc::clone(&self.state));
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("cancelled", &self.state.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TimerCallback {
        Arc::new(|| {})
    }

    #[test]
    fn test_generation_invalidates_older_entries() {
        let state = Arc::new(EntryState::new());
        let entry = TimerEntry {
            trigger: Instant::now(),
            interval: Duration::from_millis(10),
            repeating: false,
            generation: 0,
            state: Arc::clone(&state),
            callback: noop(),
        };
        assert!(entry.is_live());

        let next = state.bump_generation();
        assert!(!entry.is_live());

        let replacement = TimerEntry {
            trigger: Instant::now(),
            interval: Duration::from_millis(10),
            repeating: false,
            generation: next,
            state: Arc::clone(&state),
            callback: noop(),
        };
        assert!(replacement.is_live());
    }

    #[test]
    fn test_cancel_tombstones_all_generations() {
        let state = Arc::new(EntryState::new());
        let entry = TimerEntry {
            trigger: Instant::now(),
            interval: Duration::ZERO,
            repeating: true,
            generation: 0,
            state: Arc::clone(&state),
            callback: noop(),
        };
        state.cancel();
        assert!(!entry.is_live());
    }
}
