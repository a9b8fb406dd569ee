//! Interruptible timed waits for diagnostic HTTP endpoints.
//!
//! The crate holds a peer connection open for a requested number of seconds,
//! checking liveness once per 1-second increment, and reports how long it
//! actually waited and whether the peer went away. The layout keeps a strict
//! separation:
//!
//! - **[`core`]**: the wait controller and the capabilities it consumes
//!   (clock, liveness, observer). No sockets or global state.
//! - **[`io`]**: production capability implementations (tokio clock,
//!   `tracing` observer) and server configuration.

pub mod core;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
