//! TCP reachability probe.
//!
//! A probe is a bare TCP connect: no payload is sent and the connection is
//! dropped as soon as it is established. Name resolution counts against the
//! same timeout as the handshake.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{self, Instant};

use crate::config::WardenConfig;

/// Address the probe connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Immutable probe schedule and target, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Time between probe attempts.
    pub interval: Duration,
    /// Upper bound for one attempt.
    pub timeout: Duration,
    /// Grace window after launch.
    pub start_period: Duration,
    /// Consecutive failures before unhealthy.
    pub retries: u32,
    pub target: ProbeTarget,
}

impl ProbeConfig {
    /// Derive the probe settings from a validated configuration.
    pub fn from_config(config: &WardenConfig) -> Self {
        let health = &config.health_check;
        let host = health
            .target_host
            .clone()
            .unwrap_or_else(|| probe_host_for(&config.service.host));
        let port = health.target_port.unwrap_or(config.service.port);

        Self {
            interval: Duration::from_secs(health.interval_secs),
            timeout: Duration::from_secs(health.timeout_secs),
            start_period: Duration::from_secs(health.start_period_secs),
            retries: health.retries,
            target: ProbeTarget::new(host, port),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            start_period: Duration::from_secs(30),
            retries: 3,
            target: ProbeTarget::new("127.0.0.1", 8000),
        }
    }
}

/// Host to connect to for a service listening on `listen_host`.
///
/// A wildcard bind address is not a connect destination, so it maps to the
/// loopback address of the same family.
pub fn probe_host_for(listen_host: &str) -> String {
    let trimmed = listen_host.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return "127.0.0.1".to_string();
    }
    match trimmed.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => "127.0.0.1".to_string(),
        Ok(IpAddr::V6(ip)) if ip.is_unspecified() => "::1".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Why a probe attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe of {target} timed out after {timeout:?}")]
    Timeout {
        target: ProbeTarget,
        timeout: Duration,
    },

    #[error("connection to {target} failed: {source}")]
    Connection {
        target: ProbeTarget,
        #[source]
        source: std::io::Error,
    },
}

/// Attempt a TCP connect to `target`, bounded by `timeout`.
///
/// Returns the time taken to establish the connection.
pub async fn probe_once(target: &ProbeTarget, timeout: Duration) -> Result<Duration, ProbeError> {
    let started = Instant::now();
    match time::timeout(timeout, TcpStream::connect((target.host.as_str(), target.port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Ok(started.elapsed())
        }
        Ok(Err(source)) => Err(ProbeError::Connection {
            target: target.clone(),
            source,
        }),
        Err(_) => Err(ProbeError::Timeout {
            target: target.clone(),
            timeout,
        }),
    }
}

/// A single reachability check run by the health monitor.
pub trait Probe: Send {
    fn probe(&mut self) -> impl Future<Output = Result<Duration, ProbeError>> + Send;
}

/// The production probe: TCP connect to a fixed target.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: ProbeTarget,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: ProbeTarget, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.target.clone(), config.timeout)
    }

    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }
}

impl Probe for TcpProbe {
    fn probe(&mut self) -> impl Future<Output = Result<Duration, ProbeError>> + Send {
        probe_once(&self.target, self.timeout)
    }
}
