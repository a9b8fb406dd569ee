//! Time source for the wait loop.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall-clock readings plus a cooperative sleep.
///
/// The sleep must yield to the scheduler and be safe to drop before it
/// completes; dropping it is how a cancelled wait releases its timer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}
