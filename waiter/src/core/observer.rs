//! Progress notifications emitted by the wait loop.

use crate::core::types::WaitResult;

/// A point in the wait loop worth reporting to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitEvent {
    /// Validation passed and the clock started.
    Started { requested_secs: u64 },
    /// Pre-sleep liveness reading for the increment about to run.
    Tick {
        elapsed_secs: u64,
        requested_secs: u64,
        connected: bool,
    },
    /// The peer is gone: found by a post-sleep check, or by the first check
    /// before any time was spent (`elapsed_secs == 0`).
    Disconnected { elapsed_secs: u64 },
    Finished(WaitResult),
}

/// Receives [`WaitEvent`]s synchronously from the controller.
///
/// Observers must not block; they run inline between suspension points.
pub trait WaitObserver: Send + Sync {
    fn observe(&self, event: &WaitEvent);
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WaitObserver for NoopObserver {
    fn observe(&self, _event: &WaitEvent) {}
}


impl<T: WaitObserver> WaitObserver for &T {
    fn observe(&self, event: &WaitEvent) {
        (**self).observe(event);
    }
}
