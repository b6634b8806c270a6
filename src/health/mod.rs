//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Probe (probe.rs):
//!     TCP connect to the service port, bounded by timeout
//!
//! Monitor (monitor.rs):
//!     Periodic timer
//!     → Probe the service (one attempt at a time)
//!     → Update state.rs
//!     → Hand report to report.rs
//!
//! State machine (state.rs):
//!     Starting → Healthy ⇄ Unhealthy
//!     Start period absorbs early failures
//!
//! Reporters (report.rs):
//!     Logs, metrics gauges, status file
//! ```
//!
//! # Design Decisions
//! - Health state is owned by the monitor loop, never shared
//! - The monitor only signals; restart policy belongs to the orchestrator

pub mod monitor;
pub mod probe;
pub mod report;
pub mod state;

pub use monitor::{check_once, HealthMonitor};
pub use probe::{probe_once, Probe, ProbeConfig, ProbeError, ProbeTarget, TcpProbe};
pub use report::{
    read_status_file, reporters_for, HealthReport, HealthReporter, LogReporter, MetricsReporter,
    StatusFileReporter,
};
pub use state::{HealthState, HealthStatus, Transition};
