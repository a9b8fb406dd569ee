//! Shared application state for the waiter server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use waiter::core::observer::WaitEvent;
use waiter::io::config::ServerConfig;

/// Wait progress broadcast to `/events` subscribers.
#[derive(Debug, Clone)]
pub struct WaitUpdate {
    /// Server-assigned id, unique for the process lifetime.
    pub wait_id: u64,
    pub client: SocketAddr,
    pub event: WaitEvent,
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Host name reported by `GET /`.
    pub hostname: Arc<str>,
    /// Broadcast sender for wait progress.
    pub event_tx: Arc<broadcast::Sender<WaitUpdate>>,
    /// Cancelled on server shutdown; every wait runs under a child token.
    pub shutdown: CancellationToken,
    next_wait_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig, hostname: impl Into<Arc<str>>) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_buffer);
        Self {
            config: Arc::new(config),
            hostname: hostname.into(),
            event_tx: Arc::new(event_tx),
            shutdown: CancellationToken::new(),
            next_wait_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_wait_id(&self) -> u64 {
        self.next_wait_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Local host name, or `"unknown"` if the OS will not say.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
