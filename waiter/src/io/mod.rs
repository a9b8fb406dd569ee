//! Production implementations and configuration for the wait core.

pub mod clock;
pub mod config;
pub mod observer;
