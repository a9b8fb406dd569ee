//! HTTP route handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{error, info};
use waiter::core::observer::{WaitEvent, WaitObserver};
use waiter::core::types::WaitResult;
use waiter::core::wait::{TimedWaitController, WaitError};
use waiter::io::clock::TokioClock;
use waiter::io::observer::TracingObserver;

use crate::probe::PeerInfo;
use crate::state::{AppState, WaitUpdate};

/// Build the router for the plain HTTP endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/delay", get(delay))
}

/// GET / - greeting that names the serving host.
async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "Hello": format!("World from {}", state.hostname) }))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct DelayQuery {
    /// Seconds to hold the response.
    #[serde(default)]
    timeout: i64,
}

/// Body of a successful `/delay` response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayResponse {
    pub timeout: u64,
    pub start: String,
    pub end: String,
    pub actual_delay: u64,
    pub client_disconnected: bool,
}

impl From<&WaitResult> for DelayResponse {
    fn from(result: &WaitResult) -> Self {
        Self {
            timeout: result.requested_secs,
            start: iso_timestamp(result.start),
            end: iso_timestamp(result.end),
            actual_delay: result.actual_secs,
            client_disconnected: result.peer_disconnected,
        }
    }
}

/// ISO-8601 UTC with a trailing `Z`; microseconds are shown only when non-zero.
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    if ts.timestamp_subsec_micros() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("timeout of {requested}s exceeds the server limit of {max}s")]
    TimeoutTooLarge { requested: i64, max: u64 },
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("wait task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::TimeoutTooLarge { .. }
            | ApiError::Wait(WaitError::InvalidArgument { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Wait(WaitError::Liveness(_)) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %self, "delay request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Logs each wait event and republishes it to `/events` subscribers.
struct RequestObserver {
    wait_id: u64,
    client: SocketAddr,
    log: TracingObserver,
    event_tx: Arc<broadcast::Sender<WaitUpdate>>,
}

impl WaitObserver for RequestObserver {
    fn observe(&self, event: &WaitEvent) {
        self.log.observe(event);
        // Sending fails only when nobody is subscribed.
        let _ = self.event_tx.send(WaitUpdate {
            wait_id: self.wait_id,
            client: self.client,
            event: event.clone(),
        });
    }
}

/// GET /delay?timeout=N - hold the response for up to N seconds.
///
/// The wait runs on its own task so it outlives this handler if hyper drops
/// it on a closed connection. The task then sees the hang-up through the
/// connection probe at its next post-sleep check and stops as disconnected.
/// Only server shutdown cancels it.
async fn delay(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<PeerInfo>,
    Query(query): Query<DelayQuery>,
) -> Result<Json<DelayResponse>, ApiError> {
    let wait_id = state.next_wait_id();
    info!(
        wait_id,
        client = %peer.addr,
        host = %state.hostname,
        timeout = query.timeout,
        "new /delay request"
    );

    let max = state.config.max_timeout_secs;
    if u64::try_from(query.timeout).is_ok_and(|requested| requested > max) {
        return Err(ApiError::TimeoutTooLarge {
            requested: query.timeout,
            max,
        });
    }

    let cancel = state.shutdown.child_token();

    let observer = RequestObserver {
        wait_id,
        client: peer.addr,
        log: TracingObserver::new(peer.addr.to_string()),
        event_tx: state.event_tx.clone(),
    };
    let controller = TimedWaitController::new(TokioClock::new(), observer);
    let probe = peer.probe;
    let timeout = query.timeout;

    let result =
        tokio::spawn(async move { controller.run(timeout, &probe, &cancel).await }).await??;

    Ok(Json(DelayResponse::from(&result)))
}
