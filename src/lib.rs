//! Service Warden Library
//!
//! Launches a containerised service under an unprivileged identity and
//! reports its liveness by periodically TCP-probing the service port.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::WardenConfig;
pub use health::{HealthMonitor, HealthStatus, ProbeConfig};
pub use lifecycle::{Launcher, Shutdown, Supervisor};
