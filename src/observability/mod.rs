//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (probe counters, health gauges)
//!
//! Consumers:
//!     → Container log driver (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Logs go to stderr so `check` can keep stdout for its report
//! - Metrics are off by default; the exit code and status file are the primary signal

pub mod logging;
pub mod metrics;
