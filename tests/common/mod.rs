//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use service_warden::health::{HealthReport, HealthReporter, Probe, ProbeError, ProbeTarget};
use service_warden::lifecycle::{Credentials, Identity, PrivilegeDrop, PrivilegeError};
use tokio::net::TcpListener;

/// Start a service stand-in that accepts and immediately drops connections.
pub async fn start_mock_service() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => drop(socket),
                Err(_) => break,
            }
        }
    });

    (addr, handle)
}

/// A loopback port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Collects every report the monitor emits.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<HealthReport>>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<HealthReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthReporter for RecordingReporter {
    async fn report(&mut self, report: &HealthReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Probe that replays a fixed script of outcomes, then repeats the last one.
///
/// Each attempt takes `latency`; the number of attempts in flight is tracked
/// so tests can assert probes never overlap.
#[derive(Clone)]
pub struct ScriptedProbe {
    outcomes: Arc<Mutex<VecDeque<bool>>>,
    last: Arc<Mutex<bool>>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(outcomes: &[bool]) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.iter().copied().collect())),
            last: Arc::new(Mutex::new(outcomes.last().copied().unwrap_or(true))),
            latency: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(&[false])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> bool {
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(ok) => ok,
            None => *self.last.lock().unwrap(),
        }
    }
}

impl Probe for ScriptedProbe {
    async fn probe(&mut self) -> Result<Duration, ProbeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let ok = self.next_outcome();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if ok {
            Ok(self.latency)
        } else {
            Err(ProbeError::Connection {
                target: ProbeTarget::new("127.0.0.1", 8000),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        }
    }
}

/// Privilege switch that always succeeds without touching the process.
#[derive(Clone, Copy, Default)]
pub struct KeepCurrentIdentity;

impl PrivilegeDrop for KeepCurrentIdentity {
    fn assume(&self, _identity: Option<&Identity>) -> Result<Option<Credentials>, PrivilegeError> {
        Ok(None)
    }
}

/// Privilege switch that always fails, counting attempts.
#[derive(Clone, Default)]
pub struct DeniedIdentity {
    pub attempts: Arc<AtomicUsize>,
}

impl PrivilegeDrop for DeniedIdentity {
    fn assume(&self, identity: Option<&Identity>) -> Result<Option<Credentials>, PrivilegeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PrivilegeError {
            identity: identity.map(ToString::to_string).unwrap_or_default(),
            reason: "setuid failed: EPERM".into(),
        })
    }
}
