//! Connection liveness capability.

use std::future::Future;
use std::io;

/// Failure of the liveness check itself, as opposed to a normal disconnect.
#[derive(Debug, thiserror::Error)]
#[error("liveness check failed: {source}")]
pub struct LivenessError {
    #[from]
    source: io::Error,
}

impl LivenessError {
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// Reports whether the peer of the current request is still connected.
///
/// Implementations are called repeatedly, at least twice per increment, and
/// must answer from current state every time. `Ok(false)` is a normal
/// disconnect; `Err` is reserved for infrastructure failures.
pub trait LivenessCheck: Send + Sync {
    fn is_connected(&self) -> impl Future<Output = Result<bool, LivenessError>> + Send;
}

