//! Server-Sent Events stream of wait progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use waiter::core::observer::WaitEvent;
use waiter::core::types::WaitOutcome;

use crate::routes::iso_timestamp;
use crate::state::{AppState, WaitUpdate};

#[derive(Debug, Serialize)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    wait_id: u64,
    client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_disconnected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<WaitOutcome>,
}

impl SsePayload {
    fn new(event_type: &'static str, update: &WaitUpdate) -> Self {
        Self {
            event_type,
            wait_id: update.wait_id,
            client: update.client.to_string(),
            timeout: None,
            elapsed: None,
            connected: None,
            start: None,
            end: None,
            actual_delay: None,
            client_disconnected: None,
            outcome: None,
        }
    }
}

impl From<&WaitUpdate> for SsePayload {
    fn from(update: &WaitUpdate) -> Self {
        match &update.event {
            WaitEvent::Started { requested_secs } => SsePayload {
                timeout: Some(*requested_secs),
                ..SsePayload::new("started", update)
            },
            WaitEvent::Tick {
                elapsed_secs,
                requested_secs,
                connected,
            } => SsePayload {
                timeout: Some(*requested_secs),
                elapsed: Some(*elapsed_secs),
                connected: Some(*connected),
                ..SsePayload::new("tick", update)
            },
            WaitEvent::Disconnected { elapsed_secs } => SsePayload {
                elapsed: Some(*elapsed_secs),
                connected: Some(false),
                ..SsePayload::new("disconnected", update)
            },
            WaitEvent::Finished(result) => SsePayload {
                timeout: Some(result.requested_secs),
                start: Some(iso_timestamp(result.start)),
                end: Some(iso_timestamp(result.end)),
                actual_delay: Some(result.actual_secs),
                client_disconnected: Some(result.peer_disconnected),
                outcome: Some(result.outcome),
                ..SsePayload::new("finished", update)
            },
        }
    }
}

/// SSE endpoint handler.
///
/// The stream ends when the server starts shutting down so graceful shutdown
/// is not held open by idle subscribers.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();
    let shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        // Send initial connected event
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(update) => {
                    let payload = SsePayload::from(&update);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("wait").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
        debug!("SSE stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.config.sse_keep_alive_secs))
            .text("ping"),
    )
}
