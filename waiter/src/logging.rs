//! Tracing setup shared by the waiter binaries.
//!
//! Wait progress is reported through [`crate::io::observer::TracingObserver`];
//! this module only installs the subscriber that renders it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to `default_directives` when it is unset or
/// invalid. Output: stderr, compact format with timestamps and levels.
///
/// # Example
/// ```bash
/// RUST_LOG=waiter=debug waiter-server --port 8080
/// ```
pub fn init(default_directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
