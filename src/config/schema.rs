//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the warden.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the service warden.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct WardenConfig {
    /// Where the supervised service listens.
    pub service: ServiceConfig,

    /// Identity, working directory and environment for the service.
    pub launcher: LauncherConfig,

    /// Liveness probe settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listening address handed to the service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Host the service binds (e.g., "0.0.0.0" for all interfaces).
    pub host: String,

    /// Port the service binds.
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Launcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Unprivileged user to run as (name or numeric uid).
    pub user: Option<String>,

    /// Group to run as (name or numeric gid). Defaults to the user's primary group.
    pub group: Option<String>,

    /// Working directory for the service.
    pub working_directory: Option<PathBuf>,

    /// Extra environment variables exported to the service.
    pub environment: BTreeMap<String, String>,

    /// Grace period between SIGTERM and SIGKILL when stopping a supervised service.
    pub shutdown_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            user: None,
            group: None,
            working_directory: None,
            environment: BTreeMap::new(),
            shutdown_timeout_secs: 10,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Time between probe attempts in seconds.
    pub interval_secs: u64,

    /// Upper bound for a single probe attempt in seconds.
    pub timeout_secs: u64,

    /// Grace window after launch during which failures never report unhealthy.
    pub start_period_secs: u64,

    /// Number of consecutive failures before reporting unhealthy.
    pub retries: u32,

    /// Host to probe. Derived from `service.host` when unset.
    pub target_host: Option<String>,

    /// Port to probe. Defaults to `service.port`.
    pub target_port: Option<u16>,

    /// File rewritten with the latest health report as JSON.
    pub status_file: Option<PathBuf>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 10,
            start_period_secs: 30,
            retries: 3,
            target_host: None,
            target_port: None,
            status_file: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
