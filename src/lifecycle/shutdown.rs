//! Shutdown coordination.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Why the warden is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal from the container runtime or a terminal.
    Signal(&'static str),
    /// The supervised service exited on its own.
    ServiceExited,
    /// Stopped programmatically.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal(name) => write!(f, "signal {}", name),
            StopReason::ServiceExited => write!(f, "service exited"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

/// Fan-out of the stop request to every long-running task.
///
/// Cloning yields another handle onto the same channel, so the signal
/// listener and the supervisor can both hold one. The first trigger is
/// remembered, so a task that subscribes late can still see it via
/// [`Shutdown::is_triggered`].
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<StopReason>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StopReason> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        self.trigger_with(StopReason::Requested);
    }

    /// Notify every subscriber. Only the first call has an effect.
    pub fn trigger_with(&self, reason: StopReason) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(reason = %reason, subscribers = self.tx.receiver_count(), "Stopping");
        let _ = self.tx.send(reason);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
