//! Health report delivery.
//!
//! Every probe produces a [`HealthReport`] which is handed to each configured
//! [`HealthReporter`]. Reporters only publish the signal; none of them acts on it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WardenConfig;
use crate::health::state::HealthStatus;
use crate::observability::metrics;

/// Outcome of one probe as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub previous_status: HealthStatus,
    pub consecutive_failures: u32,
    pub target: String,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn changed(&self) -> bool {
        self.status != self.previous_status
    }

    pub fn probe_succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A sink for health reports.
///
/// Reports are delivered in probe order; the next probe waits for every
/// reporter to finish.
#[async_trait]
pub trait HealthReporter: Send {
    async fn report(&mut self, report: &HealthReport);
}

/// Structured log output for every probe.
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl HealthReporter for LogReporter {
    async fn report(&mut self, report: &HealthReport) {
        if report.changed() {
            match report.status {
                HealthStatus::Unhealthy => tracing::warn!(
                    target_addr = %report.target,
                    from = %report.previous_status,
                    consecutive_failures = report.consecutive_failures,
                    error = report.error.as_deref().unwrap_or(""),
                    "Service became unhealthy"
                ),
                _ => tracing::info!(
                    target_addr = %report.target,
                    from = %report.previous_status,
                    to = %report.status,
                    "Service health changed"
                ),
            }
            return;
        }

        match (&report.error, report.status) {
            (Some(error), HealthStatus::Starting) => tracing::debug!(
                target_addr = %report.target,
                consecutive_failures = report.consecutive_failures,
                error = %error,
                "Probe failed during startup"
            ),
            (Some(error), _) => tracing::warn!(
                target_addr = %report.target,
                consecutive_failures = report.consecutive_failures,
                error = %error,
                "Probe failed"
            ),
            (None, status) => tracing::debug!(
                target_addr = %report.target,
                status = %status,
                "Probe succeeded"
            ),
        }
    }
}

/// Publishes probe counters and health gauges.
#[derive(Debug, Default)]
pub struct MetricsReporter;

#[async_trait]
impl HealthReporter for MetricsReporter {
    async fn report(&mut self, report: &HealthReport) {
        metrics::record_probe(report.probe_succeeded());
        metrics::record_health(report.status, report.consecutive_failures);
    }
}

/// Rewrites a JSON file with the latest report.
///
/// The file is replaced by rename so readers never see a partial write.
#[derive(Debug, Clone)]
pub struct StatusFileReporter {
    path: PathBuf,
}

impl StatusFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, report: &HealthReport) -> io::Result<()> {
        let body = serde_json::to_vec_pretty(report).map_err(io::Error::other)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl HealthReporter for StatusFileReporter {
    async fn report(&mut self, report: &HealthReport) {
        if let Err(e) = self.write(report).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write status file");
        }
    }
}

/// Reporters enabled by `config`. Logging is always on.
pub fn reporters_for(config: &WardenConfig) -> Vec<Box<dyn HealthReporter>> {
    let mut reporters: Vec<Box<dyn HealthReporter>> = vec![Box::new(LogReporter)];
    if config.observability.metrics_enabled {
        reporters.push(Box::new(MetricsReporter));
    }
    if let Some(path) = &config.health_check.status_file {
        reporters.push(Box::new(StatusFileReporter::new(path)));
    }
    reporters
}

/// Read back a report written by [`StatusFileReporter`].
pub fn read_status_file(path: &Path) -> io::Result<HealthReport> {
    let content = fs::read(path)?;
    serde_json::from_slice(&content).map_err(io::Error::other)
}
