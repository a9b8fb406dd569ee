//! Interruptible timed wait.
//!
//! [`TimedWaitController`] holds a connection open for a requested number of
//! seconds, one increment at a time:
//!
//! ```text
//! Running(n) -> Running(n + 1)      peer still connected after the sleep
//!            -> Disconnected(n + 1) post-sleep check reports the peer gone
//!            -> Cancelled(n)        host cancelled during the sleep
//! Running(requested) -> Completed(requested)
//! ```
//!
//! Each increment is `check -> sleep -> increment -> check`. The pre-sleep
//! check feeds progress events; only on the very first increment does a
//! disconnected reading stop the loop, since no time has been spent yet.
//! Every later disconnection is detected at the post-sleep check.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::core::clock::Clock;
use crate::core::liveness::{LivenessCheck, LivenessError};
use crate::core::observer::{WaitEvent, WaitObserver};
use crate::core::types::{WaitOutcome, WaitResult};

/// Length of one wait increment.
pub const INCREMENT: Duration = Duration::from_secs(1);

/// Errors that abort a wait without producing a [`WaitResult`].
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout must be a non-negative number of seconds, got {requested_secs}")]
    InvalidArgument { requested_secs: i64 },
    #[error(transparent)]
    Liveness(#[from] LivenessError),
}

/// Drives the wait loop against injected clock and observer capabilities.
#[derive(Debug, Clone)]
pub struct TimedWaitController<C, O> {
    clock: C,
    observer: O,
}

impl<C: Clock, O: WaitObserver> TimedWaitController<C, O> {
    pub fn new(clock: C, observer: O) -> Self {
        Self { clock, observer }
    }

    /// Wait up to `requested_secs` seconds while `liveness` reports the peer
    /// connected.
    ///
    /// Cancelling `cancel` interrupts the current sleep; the wait then
    /// returns a partial result with [`WaitOutcome::Cancelled`].
    #[instrument(skip_all, fields(requested_secs = requested_secs))]
    pub async fn run<L: LivenessCheck>(
        &self,
        requested_secs: i64,
        liveness: &L,
        cancel: &CancellationToken,
    ) -> Result<WaitResult, WaitError> {
        let requested = u64::try_from(requested_secs)
            .map_err(|_| WaitError::InvalidArgument { requested_secs })?;

        let start = self.clock.now();
        self.observer.observe(&WaitEvent::Started {
            requested_secs: requested,
        });

        let mut elapsed = 0u64;
        let mut stopped: Option<WaitOutcome> = None;

        while elapsed < requested {
            let connected = liveness.is_connected().await?;
            self.observer.observe(&WaitEvent::Tick {
                elapsed_secs: elapsed,
                requested_secs: requested,
                connected,
            });
            if !connected && elapsed == 0 {
                self.observer.observe(&WaitEvent::Disconnected { elapsed_secs: 0 });
                stopped = Some(WaitOutcome::Disconnected);
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(elapsed, "wait cancelled during sleep");
                    stopped = Some(WaitOutcome::Cancelled);
                    break;
                }
                () = self.clock.sleep(INCREMENT) => {}
            }
            elapsed += 1;

            if !liveness.is_connected().await? {
                self.observer.observe(&WaitEvent::Disconnected {
                    elapsed_secs: elapsed,
                });
                stopped = Some(WaitOutcome::Disconnected);
                break;
            }
        }

        let end = self.clock.now();

        let (outcome, peer_disconnected) = match stopped {
            Some(WaitOutcome::Disconnected) => (WaitOutcome::Disconnected, true),
            other => {
                // Report the state at completion, not a reading from an earlier increment.
                let connected = liveness.is_connected().await?;
                (other.unwrap_or(WaitOutcome::Completed), !connected)
            }
        };

        let result = WaitResult {
            requested_secs: requested,
            start,
            end,
            actual_secs: elapsed,
            peer_disconnected,
            outcome,
        };
        self.observer.observe(&WaitEvent::Finished(result.clone()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::clock::TokioClock;
    use crate::test_support::{LivenessStep, RecordingObserver, ScriptedLiveness};

    fn controller() -> TimedWaitController<TokioClock, RecordingObserver> {
        TimedWaitController::new(TokioClock::new(), RecordingObserver::default())
    }

    #[tokio::test(start_paused = true)]
    async fn zero_seconds_checks_liveness_once() {
        let liveness = ScriptedLiveness::always_connected();
        let result = controller()
            .run(0, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 0);
        assert!(!result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Completed);
        assert_eq!(result.start, result.end);
        assert_eq!(liveness.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_seconds_reports_already_disconnected_peer() {
        let liveness = ScriptedLiveness::new(vec![LivenessStep::Disconnected]);
        let result = controller()
            .run(0, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 0);
        assert!(result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn connected_peer_gets_full_duration() {
        let liveness = ScriptedLiveness::always_connected();
        let result = controller()
            .run(3, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(result.requested_secs, 3);
        assert_eq!(result.actual_secs, 3);
        assert!(!result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Completed);
        assert_eq!(result.wall_time(), chrono::TimeDelta::seconds(3));
        // Two checks per increment plus the final reading.
        assert_eq!(liveness.calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn post_sleep_disconnect_stops_at_that_increment() {
        let liveness = ScriptedLiveness::connected_for(2);
        let result = controller()
            .run(5, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        // Third call is the pre-sleep check of increment 2 (observational);
        // the fourth, post-sleep, detects the disconnect.
        assert_eq!(result.actual_secs, 2);
        assert!(result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Disconnected);
        assert_eq!(result.wall_time(), chrono::TimeDelta::seconds(2));
        assert_eq!(liveness.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_first_sleep_returns_immediately() {
        let liveness = ScriptedLiveness::connected_for(0);
        let result = controller()
            .run(10, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 0);
        assert!(result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Disconnected);
        assert_eq!(result.start, result.end);
        assert_eq!(liveness.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn final_check_reflects_state_at_completion() {
        let liveness = ScriptedLiveness::connected_for(4);
        let result = controller()
            .run(2, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 2);
        assert!(result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Completed);
        assert_eq!(liveness.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_duration_is_rejected_without_checks() {
        let liveness = ScriptedLiveness::always_connected();
        let observer = RecordingObserver::default();
        let controller = TimedWaitController::new(TokioClock::new(), &observer);
        let err = controller
            .run(-1, &liveness, &CancellationToken::new())
            .await
            .expect_err("negative duration");

        assert!(matches!(
            err,
            WaitError::InvalidArgument { requested_secs: -1 }
        ));
        assert_eq!(liveness.calls(), 0);
        assert!(observer.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn liveness_failure_propagates() {
        let liveness = ScriptedLiveness::new(vec![
            LivenessStep::Connected,
            LivenessStep::Fail(std::io::ErrorKind::PermissionDenied),
        ]);
        let err = controller()
            .run(5, &liveness, &CancellationToken::new())
            .await
            .expect_err("liveness failure");

        match err {
            WaitError::Liveness(source) => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(liveness.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_current_sleep() {
        let liveness = ScriptedLiveness::always_connected();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4_500)).await;
            trigger.cancel();
        });

        let result = controller()
            .run(10, &liveness, &cancel)
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 4);
        assert!(!result.peer_disconnected);
        assert_eq!(result.outcome, WaitOutcome::Cancelled);
        assert_eq!(result.wall_time(), chrono::TimeDelta::milliseconds(4_500));
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_still_yields_a_result() {
        let liveness = ScriptedLiveness::always_connected();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = controller()
            .run(5, &liveness, &cancel)
            .await
            .expect("wait");

        assert_eq!(result.actual_secs, 0);
        assert_eq!(result.outcome, WaitOutcome::Cancelled);
        assert_eq!(liveness.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_ticks_then_finish() {
        let liveness = ScriptedLiveness::always_connected();
        let observer = RecordingObserver::default();
        let controller = TimedWaitController::new(TokioClock::new(), &observer);
        let result = controller
            .run(2, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(
            observer.events(),
            vec![
                WaitEvent::Started { requested_secs: 2 },
                WaitEvent::Tick {
                    elapsed_secs: 0,
                    requested_secs: 2,
                    connected: true,
                },
                WaitEvent::Tick {
                    elapsed_secs: 1,
                    requested_secs: 2,
                    connected: true,
                },
                WaitEvent::Finished(result),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_disconnect() {
        let liveness = ScriptedLiveness::connected_for(1);
        let observer = RecordingObserver::default();
        let controller = TimedWaitController::new(TokioClock::new(), &observer);
        controller
            .run(3, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        let events = observer.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], WaitEvent::Disconnected { elapsed_secs: 1 });
        assert!(matches!(&events[3], WaitEvent::Finished(r) if r.actual_secs == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_disconnect_on_first_check() {
        let liveness = ScriptedLiveness::connected_for(0);
        let observer = RecordingObserver::default();
        let controller = TimedWaitController::new(TokioClock::new(), &observer);
        let result = controller
            .run(5, &liveness, &CancellationToken::new())
            .await
            .expect("wait");

        assert_eq!(
            observer.events(),
            vec![
                WaitEvent::Started { requested_secs: 5 },
                WaitEvent::Tick {
                    elapsed_secs: 0,
                    requested_secs: 5,
                    connected: false,
                },
                WaitEvent::Disconnected { elapsed_secs: 0 },
                WaitEvent::Finished(result),
            ]
        );
    }
}
