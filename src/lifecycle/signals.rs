//! OS signal handling.
//!
//! SIGTERM (container stop) and SIGINT (interactive Ctrl-C) both translate
//! into the shared [`Shutdown`] broadcast.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::lifecycle::{Shutdown, StopReason};

/// Wait for the first termination signal and return its name.
pub async fn termination_signal() -> io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = interrupt.recv() => Ok("SIGINT"),
    }
}

/// Trigger `shutdown` when a termination signal arrives.
pub fn forward_to(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        match termination_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "Termination signal received");
                shutdown.trigger_with(StopReason::Signal(name));
            }
            Err(e) => tracing::error!(error = %e, "Failed to register signal handlers"),
        }
    })
}
