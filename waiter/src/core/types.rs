//! Shared types for the timed-wait core.
//!
//! These types define the contract between the wait controller and its host.
//! They carry no I/O handles and are never mutated once returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state reached by a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitOutcome {
    /// All requested increments elapsed.
    Completed,
    /// The liveness check reported the peer gone; the loop stopped early.
    Disconnected,
    /// The host cancelled the wait at a suspension point.
    Cancelled,
}

/// Result of one timed wait, produced exactly once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Echo of the requested duration.
    pub requested_secs: u64,
    /// Wall-clock time the wait began.
    pub start: DateTime<Utc>,
    /// Wall-clock time the wait ended. Never before `start`.
    pub end: DateTime<Utc>,
    /// Full 1-second increments completed before termination.
    pub actual_secs: u64,
    /// Whether the peer was seen disconnected at or before termination.
    pub peer_disconnected: bool,
    pub outcome: WaitOutcome,
}

impl WaitResult {
    /// Wall-clock span covered by the wait.
    pub fn wall_time(&self) -> chrono::TimeDelta {
        self.end - self.start
    }
}
