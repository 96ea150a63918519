//! Tracing bootstrap for the toolkit's lifecycle events.

use tracing_subscriber::EnvFilter;

/// Install a default fmt subscriber when the caller has not set one.
///
/// Honors `RUST_LOG`; without it, defaults to `chronopool=info` so pool and
/// scheduler lifecycle events (start, growth, shutdown, contained panics)
/// are visible out of the box without drowning out the host application.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chronopool=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
