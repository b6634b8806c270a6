//! Periodic liveness monitoring.
//!
//! # Responsibilities
//! - Probe the service every `interval`
//! - Fold each outcome into the private [`HealthState`]
//! - Hand the resulting report to every reporter
//!
//! Probes never overlap: the next tick is delayed until the current attempt
//! has completed or timed out. Shutdown interrupts an attempt in flight.
//! A failed probe is only a data point and never ends the loop.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use chrono::Utc;

use crate::health::probe::{Probe, ProbeConfig, ProbeError, TcpProbe};
use crate::health::report::{HealthReport, HealthReporter};
use crate::health::state::{HealthState, HealthStatus};
use crate::lifecycle::StopReason;

pub struct HealthMonitor<P = TcpProbe> {
    config: ProbeConfig,
    probe: P,
    reporters: Vec<Box<dyn HealthReporter>>,
    launched_at: Instant,
}

impl HealthMonitor<TcpProbe> {
    /// Monitor that TCP-probes the configured target.
    pub fn new(config: ProbeConfig, launched_at: Instant) -> Self {
        let probe = TcpProbe::from_config(&config);
        Self::with_probe(config, probe, launched_at)
    }
}

impl<P: Probe> HealthMonitor<P> {
    pub fn with_probe(config: ProbeConfig, probe: P, launched_at: Instant) -> Self {
        Self {
            config,
            probe,
            reporters: Vec::new(),
            launched_at,
        }
    }

    pub fn with_reporter(mut self, reporter: impl HealthReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn with_reporters(mut self, reporters: Vec<Box<dyn HealthReporter>>) -> Self {
        self.reporters.extend(reporters);
        self
    }

    /// Probe until a shutdown signal arrives. Returns the final status.
    ///
    /// A probe still in flight when the signal arrives is abandoned and not reported.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<StopReason>) -> HealthStatus {
        tracing::info!(
            target_addr = %self.config.target,
            interval_secs = self.config.interval.as_secs_f64(),
            timeout_secs = self.config.timeout.as_secs_f64(),
            start_period_secs = self.config.start_period.as_secs_f64(),
            retries = self.config.retries,
            "Health monitor starting"
        );

        let mut state = HealthState::new();
        // The ticker adds the period to each deadline, so the second one must fit too.
        let first_probe = Instant::now().checked_add(self.config.interval);
        let Some(first_probe) = first_probe.filter(|at| at.checked_add(self.config.interval).is_some()) else {
            tracing::error!(
                interval_secs = self.config.interval.as_secs_f64(),
                "Probe interval out of range, no probes will run"
            );
            log_stop(shutdown.recv().await);
            return state.status();
        };
        let mut ticker = time::interval_at(first_probe, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                reason = shutdown.recv() => {
                    log_stop(reason);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                reason = shutdown.recv() => {
                    log_stop(reason);
                    break;
                }
                outcome = self.probe.probe() => outcome,
            };
            self.record(&mut state, outcome).await;
        }

        state.status()
    }

    async fn record(&mut self, state: &mut HealthState, outcome: Result<Duration, ProbeError>) {
        let elapsed = self.launched_at.elapsed();

        let (transition, error) = match outcome {
            Ok(_) => (state.record_success(), None),
            Err(e) => (state.record_failure(&self.config, elapsed), Some(e.to_string())),
        };

        let report = HealthReport {
            status: transition.to,
            previous_status: transition.from,
            consecutive_failures: state.consecutive_failures(),
            target: self.config.target.to_string(),
            checked_at: Utc::now(),
            error,
        };

        for reporter in &mut self.reporters {
            reporter.report(&report).await;
        }
    }
}

fn log_stop(reason: Result<StopReason, broadcast::error::RecvError>) {
    match reason {
        Ok(reason) => tracing::info!(reason = %reason, "Health monitor stopping"),
        Err(_) => tracing::info!("Shutdown channel closed, health monitor stopping"),
    }
}

/// Run a single probe with no history, as a container `HEALTHCHECK` command does.
///
/// Retry counting is left to the caller, so any failure reports unhealthy.
pub async fn check_once<P: Probe>(config: &ProbeConfig, probe: &mut P) -> HealthReport {
    let (status, error) = match probe.probe().await {
        Ok(_) => (HealthStatus::Healthy, None),
        Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
    };

    HealthReport {
        status,
        previous_status: HealthStatus::Starting,
        consecutive_failures: u32::from(error.is_some()),
        target: config.target.to_string(),
        checked_at: Utc::now(),
        error,
    }
}
