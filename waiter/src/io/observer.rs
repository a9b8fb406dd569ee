//! Structured progress logging for timed waits.

use tracing::{debug, info, warn};

use crate::core::observer::{WaitEvent, WaitObserver};
use crate::core::types::WaitOutcome;

/// Logs every [`WaitEvent`] through `tracing`, tagged with the client that
/// issued the request.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    client: String,
}

impl TracingObserver {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
        }
    }
}

impl WaitObserver for TracingObserver {
    fn observe(&self, event: &WaitEvent) {
        let client = self.client.as_str();
        match event {
            WaitEvent::Started { requested_secs } => {
                debug!(client, requested_secs, "wait started");
            }
            WaitEvent::Tick {
                elapsed_secs,
                requested_secs,
                connected,
            } => {
                info!(
                    client,
                    healthy = connected,
                    "wait-loop: {elapsed_secs}/{requested_secs}s elapsed"
                );
            }
            WaitEvent::Disconnected { elapsed_secs } => {
                warn!(
                    client,
                    elapsed_secs, "client disconnected after {elapsed_secs}s; stopping delay"
                );
            }
            WaitEvent::Finished(result) => match result.outcome {
                WaitOutcome::Cancelled => warn!(
                    client,
                    intended = result.requested_secs,
                    actual = result.actual_secs,
                    "delay cancelled before completion"
                ),
                WaitOutcome::Completed | WaitOutcome::Disconnected => info!(
                    client,
                    intended = result.requested_secs,
                    actual = result.actual_secs,
                    client_disconnected = result.peer_disconnected,
                    "finished delay"
                ),
            },
        }
    }
}
