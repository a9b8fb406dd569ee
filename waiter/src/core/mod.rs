//! Deterministic timed-wait logic.
//!
//! Core modules never touch sockets, files, or global state. Time, liveness,
//! and progress reporting arrive as injected capabilities so every path can be
//! driven from tests with scripted fakes.

pub mod clock;
pub mod liveness;
pub mod observer;
pub mod types;
pub mod wait;
