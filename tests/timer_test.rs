//! Integration tests for the heap timer scheduler.
//!
//! These tests validate real scheduling behavior:
//! - Firing order across distinct durations
//! - Stop before/after fire
//! - Ticker re-arming and cancellation
//! - Reset superseding the pending trigger
//! - Panic containment per execution strategy
//! - Shutdown semantics

use chronopool::config::TimerConfig;
use chronopool::error::PoolError;
use chronopool::timer::{ExecStrategy, HeapTimer, TimerScheduler};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

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

// ============================================================================
// ONE-SHOT TIMERS
// ============================================================================

#[test]
fn test_timers_fire_in_duration_order() {
    let scheduler = HeapTimer::synchronous();
    let order = Arc::new(Mutex::new(Vec::new()));

    // Scheduled out of order on purpose.
    for &(label, ms) in &[("c", 150u64), ("a", 30), ("d", 200), ("b", 80)] {
        let order = Arc::clone(&order);
        scheduler.set_timer(Duration::from_millis(ms), move || {
            order.lock().push(label);
        });
    }

    assert!(wait_until(Duration::from_secs(2), || order.lock().len() == 4));
    assert_eq!(*order.lock(), vec!["a", "b", "c", "d"]);
    scheduler.shutdown();
}

#[test]
fn test_zero_duration_fires_promptly() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    scheduler.set_timer(Duration::ZERO, move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    assert!(wait_until(Duration::from_secs(1), || {
        fired.load(Ordering::SeqCst) == 1
    }));
    scheduler.shutdown();
}

#[test]
fn test_stop_before_fire_prevents_callback() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    let timer = scheduler.set_timer(Duration::from_millis(150), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });
    timer.stop();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    scheduler.shutdown();
}

#[test]
fn test_stop_after_fire_is_noop() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    let timer = scheduler.set_timer(Duration::from_millis(20), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    assert!(wait_until(Duration::from_secs(1), || {
        fired.load(Ordering::SeqCst) == 1
    }));
    timer.stop();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    scheduler.shutdown();
}

#[test]
fn test_reset_postpones_trigger() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    let timer = scheduler.set_timer(Duration::from_millis(50), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });
    timer.reset(Duration::from_millis(400));

    // The original 50ms trigger is superseded.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    assert!(wait_until(Duration::from_secs(2), || {
        fired.load(Ordering::SeqCst) == 1
    }));
    scheduler.shutdown();
}

#[test]
fn test_reset_then_stop_cancels() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    let timer = scheduler.set_timer(Duration::from_millis(100), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });
    timer.reset(Duration::from_millis(150));
    thread::sleep(Duration::from_millis(30));
    timer.stop();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    scheduler.shutdown();
}

// ============================================================================
// TICKERS
// ============================================================================

#[test]
fn test_ticker_fires_repeatedly() {
    let scheduler = HeapTimer::synchronous();
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);

    let ticker = scheduler.set_ticker(Duration::from_millis(50), move || {
        count2.fetch_add(1, Ordering::SeqCst);
    });

    // ~20 intervals fit into the window; allow generous scheduler overhead.
    thread::sleep(Duration::from_millis(1000));
    ticker.stop();
    let fired = count.load(Ordering::SeqCst);
    assert!(fired >= 10, "expected at least 10 fires, got {fired}");
    assert!(fired <= 25, "expected at most 25 fires, got {fired}");
    scheduler.shutdown();
}

#[test]
fn test_ticker_stop_halts_future_fires() {
    let scheduler = HeapTimer::synchronous();
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);

    let ticker = scheduler.set_ticker(Duration::from_millis(30), move || {
        count2.fetch_add(1, Ordering::SeqCst);
    });

    assert!(wait_until(Duration::from_secs(2), || {
        count.load(Ordering::SeqCst) >= 3
    }));
    ticker.stop();
    thread::sleep(Duration::from_millis(100));
    let frozen = count.load(Ordering::SeqCst);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(count.load(Ordering::SeqCst), frozen);
    scheduler.shutdown();
}

#[test]
#[should_panic(expected = "ticker interval must be non-zero")]
fn test_zero_interval_ticker_is_contract_violation() {
    let scheduler = HeapTimer::synchronous();
    let _ = scheduler.set_ticker(Duration::ZERO, || {});
}

#[test]
fn test_zero_channel_capacity_rejected_at_construction() {
    let mut config = TimerConfig::new();
    config.channel_capacity = 0;
    let result = HeapTimer::with_config(ExecStrategy::Sync, config);
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));

    let mut config = TimerConfig::new();
    config.trigger_queue_capacity = 0;
    let result = HeapTimer::with_config(ExecStrategy::Pooled(2), config);
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}

#[test]
fn test_with_config_valid_capacities() {
    let scheduler = HeapTimer::with_config(ExecStrategy::Sync, TimerConfig::new()).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    scheduler.set_timer(Duration::from_millis(10), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });
    assert!(wait_until(Duration::from_secs(1), || {
        fired.load(Ordering::SeqCst) == 1
    }));
    scheduler.shutdown();
}

// ============================================================================
// EXECUTION STRATEGIES
// ============================================================================

#[test]
fn test_pooled_strategy_executes_callbacks() {
    let scheduler = HeapTimer::pooled(2);
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let count = Arc::clone(&count);
        scheduler.set_timer(Duration::from_millis(10), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(wait_until(Duration::from_secs(2), || {
        count.load(Ordering::SeqCst) == 10
    }));
    scheduler.shutdown();
}

#[test]
fn test_async_strategy_executes_callbacks() {
    let scheduler = HeapTimer::asynchronous();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let count = Arc::clone(&count);
        scheduler.set_timer(Duration::from_millis(10), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(wait_until(Duration::from_secs(2), || {
        count.load(Ordering::SeqCst) == 5
    }));
    scheduler.shutdown();
}

#[test]
fn test_panicking_callback_does_not_kill_scheduler() {
    let scheduler = HeapTimer::synchronous();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);

    scheduler.set_timer(Duration::from_millis(10), || {
        panic!("callback exploded");
    });
    scheduler.set_timer(Duration::from_millis(60), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    // The second timer still fires after the first panics.
    assert!(wait_until(Duration::from_secs(2), || {
        fired.load(Ordering::SeqCst) == 1
    }));
    scheduler.shutdown();
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_is_idempotent_and_observable() {
    let scheduler = HeapTimer::synchronous();
    assert!(!scheduler.is_shutdown());
    scheduler.shutdown();
    assert!(scheduler.is_shutdown());
    scheduler.shutdown();
    assert!(scheduler.is_shutdown());
}

#[test]
fn test_scheduling_after_shutdown_is_inert() {
    let scheduler = HeapTimer::synchronous();
    scheduler.shutdown();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    let timer = scheduler.set_timer(Duration::from_millis(10), move || {
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(200));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    // Handle operations on an inert timer are harmless.
    timer.reset(Duration::from_millis(10));
    timer.stop();
}
