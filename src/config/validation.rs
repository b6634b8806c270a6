//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and the identity
//! rules. Every problem is collected so a bad config is reported in one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::WardenConfig;

/// Upper bound for every configured duration (one day).
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.host.trim().is_empty() {
        errors.push(ValidationError::new("service.host", "must not be empty"));
    }
    if config.service.port == 0 {
        errors.push(ValidationError::new("service.port", "must be between 1 and 65535"));
    }

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if health.timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.timeout_secs", "must be greater than 0"));
    }
    for (field, secs) in [
        ("health_check.interval_secs", health.interval_secs),
        ("health_check.timeout_secs", health.timeout_secs),
        ("health_check.start_period_secs", health.start_period_secs),
        ("launcher.shutdown_timeout_secs", config.launcher.shutdown_timeout_secs),
    ] {
        if secs > MAX_DURATION_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {} seconds", MAX_DURATION_SECS),
            ));
        }
    }
    if health.retries == 0 {
        errors.push(ValidationError::new("health_check.retries", "must be at least 1"));
    }
    if health.target_port == Some(0) {
        errors.push(ValidationError::new("health_check.target_port", "must be between 1 and 65535"));
    }
    if matches!(&health.target_host, Some(host) if host.trim().is_empty()) {
        errors.push(ValidationError::new("health_check.target_host", "must not be empty"));
    }

    if let Some(user) = &config.launcher.user {
        if is_superuser(user) {
            errors.push(ValidationError::new(
                "launcher.user",
                format!("`{}` is not an unprivileged identity", user),
            ));
        }
    }
    if let Some(group) = &config.launcher.group {
        if is_superuser(group) {
            errors.push(ValidationError::new(
                "launcher.group",
                format!("`{}` is not an unprivileged group", group),
            ));
        }
        if config.launcher.user.is_none() {
            errors.push(ValidationError::new("launcher.group", "requires launcher.user"));
        }
    }

    let obs = &config.observability;
    if !matches!(obs.log_level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level `{}`", obs.log_level),
        ));
    }
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected `pretty` or `json`, got `{}`", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_superuser(identity: &str) -> bool {
    let identity = identity.trim();
    identity == "root" || identity.parse::<u32>() == Ok(0)
}
