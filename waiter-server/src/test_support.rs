//! Test-only helpers for driving a live server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use waiter::core::observer::WaitEvent;
use waiter::io::config::ServerConfig;

use crate::probe::ProbedListener;
use crate::state::{AppState, WaitUpdate};

/// Serve the full app on an ephemeral localhost port.
pub async fn spawn_server(config: ServerConfig) -> (SocketAddr, AppState) {
    let state = AppState::new(config, "test-host");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = crate::build_app(state.clone());
    tokio::spawn(crate::serve(
        ProbedListener::new(listener),
        app,
        state.shutdown.clone(),
    ));
    (addr, state)
}

/// GET `path` on the test server and return (status, body).
pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client");
    let response = client
        .get(format!("http://{addr}{path}"))
        .send()
        .await
        .expect("send request");
    let status = response.status().as_u16();
    let body = response.text().await.expect("read body");
    (status, body)
}

/// Next broadcast update whose event satisfies `pred`, waiting at most 5s.
pub async fn next_matching(
    rx: &mut broadcast::Receiver<WaitUpdate>,
    pred: impl Fn(&WaitEvent) -> bool,
) -> WaitUpdate {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = rx.recv().await.expect("event stream open");
            if pred(&update.event) {
                return update;
            }
        }
    })
    .await
    .expect("event within 5s")
}
