//! Production clock backed by the tokio timer.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use crate::core::clock::Clock;

/// Clock that reads wall time once and derives later readings from tokio's
/// monotonic clock.
///
/// Readings never go backwards even if the system clock is adjusted, and they
/// follow tokio's paused clock in tests, so a 1-second sleep advances
/// [`Clock::now`] by exactly one second.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_anchor: DateTime<Utc>,
    mono_anchor: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            wall_anchor: Utc::now(),
            mono_anchor: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let since_anchor =
            TimeDelta::from_std(self.mono_anchor.elapsed()).unwrap_or(TimeDelta::MAX);
        self.wall_anchor
            .checked_add_signed(since_anchor)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
