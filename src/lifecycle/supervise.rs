//! Launch-and-monitor mode.
//!
//! The supervisor drops privileges, starts the service as a child, and runs
//! the health monitor beside it. It exits with the child's status; on a
//! termination signal it forwards SIGTERM and escalates to SIGKILL after the
//! grace period.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::time::{self, Instant};

use crate::health::{HealthMonitor, HealthReporter, ProbeConfig};
use crate::lifecycle::launcher::{LaunchError, Launcher};
use crate::lifecycle::privileges::{PrivilegeDrop, SystemPrivileges};
use crate::lifecycle::{Shutdown, StopReason};

pub struct Supervisor<D = SystemPrivileges> {
    launcher: Launcher<D>,
    probe: ProbeConfig,
    reporters: Vec<Box<dyn HealthReporter>>,
    shutdown_timeout: Duration,
}

impl<D: PrivilegeDrop> Supervisor<D> {
    pub fn new(launcher: Launcher<D>, probe: ProbeConfig) -> Self {
        Self {
            launcher,
            probe,
            reporters: Vec::new(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_reporter(mut self, reporter: impl HealthReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn with_reporters(mut self, reporters: Vec<Box<dyn HealthReporter>>) -> Self {
        self.reporters.extend(reporters);
        self
    }

    /// Run the service to completion.
    ///
    /// If the identity switch fails, neither the service nor the monitor is started.
    pub async fn run(self, shutdown: &Shutdown) -> Result<ExitStatus, LaunchError> {
        let launched_at = Instant::now();
        let mut stop = shutdown.subscribe();

        let prepared = self.launcher.prepare()?;
        if shutdown.is_triggered() {
            tracing::info!("Stop requested before launch, not starting service");
            return Err(LaunchError::Cancelled);
        }
        let mut child = prepared.spawn()?;
        tracing::info!(pid = child.id(), program = %self.launcher.spec().program, "Service started");

        let monitor = HealthMonitor::new(self.probe, launched_at).with_reporters(self.reporters);
        let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

        let result = tokio::select! {
            status = child.wait() => status,
            _ = stop.recv() => stop_child(&mut child, self.shutdown_timeout).await,
        };

        shutdown.trigger_with(StopReason::ServiceExited);
        if let Err(e) = monitor_task.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }

        let status = result.map_err(LaunchError::Wait)?;
        tracing::info!(status = %status, "Service exited");
        Ok(status)
    }
}

async fn stop_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(pid) = child.id() {
        tracing::info!(pid, "Forwarding SIGTERM to service");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(pid, error = %e, "Failed to signal service");
        }
    }

    match time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs_f64(), "Service ignored SIGTERM, killing");
            child.kill().await?;
            child.wait().await
        }
    }
}

/// Exit code to propagate for a finished service (`128 + signal` when killed).
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return (code & 0xff) as u8;
    }
    status
        .signal()
        .and_then(|sig| u8::try_from(128 + sig).ok())
        .unwrap_or(1)
}
