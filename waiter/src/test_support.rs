//! Test-only fakes for the wait loop's injected capabilities.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::liveness::{LivenessCheck, LivenessError};
use crate::core::observer::{WaitEvent, WaitObserver};

/// One scripted answer from [`ScriptedLiveness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessStep {
    Connected,
    Disconnected,
    Fail(io::ErrorKind),
}

/// Liveness check that replays a fixed script, repeating the last step once
/// the script runs out. An empty script always reports connected.
#[derive(Debug, Default)]
pub struct ScriptedLiveness {
    script: Vec<LivenessStep>,
    calls: AtomicUsize,
}

impl ScriptedLiveness {
    pub fn new(script: Vec<LivenessStep>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_connected() -> Self {
        Self::new(Vec::new())
    }

    /// Connected for the first `calls` checks, disconnected from then on.
    pub fn connected_for(calls: usize) -> Self {
        let mut script = vec![LivenessStep::Connected; calls];
        script.push(LivenessStep::Disconnected);
        Self::new(script)
    }

    /// Number of checks performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LivenessCheck for ScriptedLiveness {
    async fn is_connected(&self) -> Result<bool, LivenessError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .get(call)
            .or(self.script.last())
            .copied()
            .unwrap_or(LivenessStep::Connected);
        match step {
            LivenessStep::Connected => Ok(true),
            LivenessStep::Disconnected => Ok(false),
            LivenessStep::Fail(kind) => Err(io::Error::from(kind).into()),
        }
    }
}

/// Observer that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<WaitEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<WaitEvent> {
        self.events.lock().expect("observer lock").clone()
    }
}

impl WaitObserver for RecordingObserver {
    fn observe(&self, event: &WaitEvent) {
        self.events.lock().expect("observer lock").push(event.clone());
    }
}
