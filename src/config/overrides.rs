//! Command-line and environment overrides.
//!
//! Container platforms usually pass settings through the environment, so
//! every override can also be read from a variable.

use std::path::PathBuf;

use clap::Args;

use crate::config::schema::WardenConfig;

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Host the service listens on
    #[arg(long, env = "HOST", global = true)]
    pub host: Option<String>,

    /// Port the service listens on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Seconds between probe attempts
    #[arg(long = "interval", env = "HEALTHCHECK_INTERVAL", global = true)]
    pub interval_secs: Option<u64>,

    /// Seconds before a single probe attempt is abandoned
    #[arg(long = "timeout", env = "HEALTHCHECK_TIMEOUT", global = true)]
    pub timeout_secs: Option<u64>,

    /// Seconds after launch during which failures never report unhealthy
    #[arg(long = "start-period", env = "HEALTHCHECK_START_PERIOD", global = true)]
    pub start_period_secs: Option<u64>,

    /// Consecutive failures before reporting unhealthy
    #[arg(long, env = "HEALTHCHECK_RETRIES", global = true)]
    pub retries: Option<u32>,

    /// Unprivileged user to run the service as
    #[arg(long, env = "WARDEN_USER", global = true)]
    pub user: Option<String>,

    /// Group to run the service as
    #[arg(long, env = "WARDEN_GROUP", global = true)]
    pub group: Option<String>,

    /// Working directory for the service
    #[arg(long = "workdir", env = "WARDEN_WORKDIR", global = true)]
    pub working_directory: Option<PathBuf>,

    /// File rewritten with the latest health report
    #[arg(long, env = "WARDEN_STATUS_FILE", global = true)]
    pub status_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply every set override onto `config`.
    pub fn apply(&self, config: &mut WardenConfig) {
        if let Some(host) = &self.host {
            config.service.host = host.clone();
        }
        if let Some(port) = self.port {
            config.service.port = port;
        }

        let health = &mut config.health_check;
        if let Some(secs) = self.interval_secs {
            health.interval_secs = secs;
        }
        if let Some(secs) = self.timeout_secs {
            health.timeout_secs = secs;
        }
        if let Some(secs) = self.start_period_secs {
            health.start_period_secs = secs;
        }
        if let Some(retries) = self.retries {
            health.retries = retries;
        }
        if let Some(path) = &self.status_file {
            health.status_file = Some(path.clone());
        }

        let launcher = &mut config.launcher;
        if let Some(user) = &self.user {
            launcher.user = Some(user.clone());
        }
        if let Some(group) = &self.group {
            launcher.group = Some(group.clone());
        }
        if let Some(dir) = &self.working_directory {
            launcher.working_directory = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_overrides_change_nothing() {
        let mut config = WardenConfig::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = WardenConfig::default();
        config.health_check.retries = 7;

        let overrides = ConfigOverrides {
            port: Some(8080),
            retries: Some(2),
            start_period_secs: Some(0),
            user: Some("app".into()),
            ..Default::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.host, "0.0.0.0");
        assert_eq!(config.health_check.retries, 2);
        assert_eq!(config.health_check.start_period_secs, 0);
        assert_eq!(config.launcher.user.as_deref(), Some("app"));
    }
}
