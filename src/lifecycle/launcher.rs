//! Service launcher.
//!
//! # Responsibilities
//! - Drop to the unprivileged identity (fatal on failure, never retried)
//! - Establish working directory and environment
//! - Hand control to the service, either by `exec` or as a child process
//!
//! The launcher never waits for the service to bind its port.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::config::WardenConfig;
use crate::lifecycle::privileges::{Credentials, Identity, PrivilegeDrop, PrivilegeError, SystemPrivileges};

/// Errors that stop the service from being started.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Privilege(#[from] PrivilegeError),

    #[error("no service command given")]
    EmptyCommand,

    #[error("working directory {}: {source}", .path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("stop requested before the service was started")]
    Cancelled,

    #[error("failed to wait for service: {0}")]
    Wait(#[source] io::Error),
}

impl LaunchError {
    /// Process exit code reported for this failure (shell conventions).
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => 127,
            LaunchError::Cancelled => 143,
            _ => 126,
        }
    }
}

/// Everything needed to start the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    /// Arguments; `{host}` and `{port}` are substituted at launch.
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub host: String,
    pub port: u16,
    pub identity: Option<Identity>,
}

impl LaunchSpec {
    pub fn from_config(config: &WardenConfig, command: &[String]) -> Result<Self, LaunchError> {
        let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_directory: config.launcher.working_directory.clone(),
            environment: config.launcher.environment.clone(),
            host: config.service.host.clone(),
            port: config.service.port,
            identity: Identity::from_config(&config.launcher),
        })
    }

    pub fn rendered_args(&self) -> Vec<String> {
        let port = self.port.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{host}", &self.host).replace("{port}", &port))
            .collect()
    }

    fn command(&self, credentials: Option<&Credentials>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.rendered_args());

        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }

        cmd.env("HOST", &self.host).env("PORT", self.port.to_string());
        if let Some(credentials) = credentials {
            cmd.env("HOME", &credentials.home)
                .env("USER", &credentials.name)
                .env("LOGNAME", &credentials.name);
        }
        for (key, value) in &self.environment {
            cmd.env(key, value);
        }

        cmd
    }
}

/// Starts the service under the configured identity.
pub struct Launcher<D = SystemPrivileges> {
    spec: LaunchSpec,
    privileges: D,
}

impl Launcher<SystemPrivileges> {
    pub fn new(spec: LaunchSpec) -> Self {
        Self::with_privileges(spec, SystemPrivileges)
    }
}

impl<D: PrivilegeDrop> Launcher<D> {
    pub fn with_privileges(spec: LaunchSpec, privileges: D) -> Self {
        Self { spec, privileges }
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Drop privileges and build the service command.
    ///
    /// Nothing is started if the identity switch fails.
    pub fn prepare(&self) -> Result<PreparedLaunch, LaunchError> {
        let credentials = self.privileges.assume(self.spec.identity.as_ref())?;

        if let Some(dir) = &self.spec.working_directory {
            let metadata = fs::metadata(dir).map_err(|source| LaunchError::WorkingDirectory {
                path: dir.clone(),
                source,
            })?;
            if !metadata.is_dir() {
                return Err(LaunchError::WorkingDirectory {
                    path: dir.clone(),
                    source: io::Error::other("not a directory"),
                });
            }
        }

        tracing::info!(
            program = %self.spec.program,
            host = %self.spec.host,
            port = self.spec.port,
            user = credentials.as_ref().map(|c| c.name.as_str()).unwrap_or("(current)"),
            "Launching service"
        );

        Ok(PreparedLaunch {
            program: self.spec.program.clone(),
            command: self.spec.command(credentials.as_ref()),
        })
    }
}

/// A service command ready to run under the dropped identity.
#[derive(Debug)]
pub struct PreparedLaunch {
    program: String,
    command: Command,
}

impl PreparedLaunch {
    /// Replace the current process with the service. Only returns on failure.
    pub fn exec(mut self) -> LaunchError {
        let source = self.command.exec();
        LaunchError::Spawn {
            program: self.program,
            source,
        }
    }

    /// Start the service as a child process.
    pub fn spawn(self) -> Result<tokio::process::Child, LaunchError> {
        let mut command = tokio::process::Command::from(self.command);
        command.kill_on_drop(true);
        command.spawn().map_err(|source| LaunchError::Spawn {
            program: self.program,
            source,
        })
    }
}
