//! Service Warden
//!
//! Process-lifecycle and liveness contract for a containerised web service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Orchestrator
//!         │ start                                    ▲ healthy / unhealthy
//!         ▼                                          │ (exit code, status file, metrics)
//!   ┌──────────────┐   drop privileges    ┌──────────┴─────────┐
//!   │   launcher   │ ───────────────────▶ │      service       │
//!   │ (lifecycle)  │   chdir, env, exec   │  listens on :PORT  │
//!   └──────────────┘                      └──────────▲─────────┘
//!                                                    │ TCP connect
//!                                         ┌──────────┴─────────┐
//!                                         │   health monitor   │
//!                                         │ every interval,    │
//!                                         │ bounded by timeout │
//!                                         └────────────────────┘
//! ```
//!
//! # Subcommands
//! - `launch -- <cmd>`: drop privileges and exec the service
//! - `run -- <cmd>`: drop privileges, spawn the service, monitor it
//! - `probe`: monitor an already running service
//! - `check`: a single probe, exit 0 when reachable

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::Instant;

use service_warden::config::{resolve_config, ConfigOverrides, WardenConfig};
use service_warden::health::{
    check_once, reporters_for, HealthMonitor, HealthStatus, ProbeConfig, TcpProbe,
};
use service_warden::lifecycle::{exit_code, signals, LaunchSpec, Launcher, Shutdown, Supervisor};
use service_warden::observability::{logging, metrics};

const CONFIG_ERROR_EXIT: u8 = 2;

#[derive(Parser)]
#[command(name = "service-warden", version)]
#[command(about = "Launch a service unprivileged and report its liveness", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "WARDEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop privileges and replace this process with the service
    Launch {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Drop privileges, start the service and monitor its port
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Monitor an already running service until terminated
    Probe,
    /// Probe once; exit 0 when the service accepts connections
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref(), &cli.overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("service-warden: {}", e);
            return ExitCode::from(CONFIG_ERROR_EXIT);
        }
    };

    logging::init(&config.observability);

    match cli.command {
        Commands::Launch { command } => launch(&config, &command),
        Commands::Run { command } => run(&config, &command).await,
        Commands::Probe => probe(&config).await,
        Commands::Check => check(&config).await,
    }
}

fn launch(config: &WardenConfig, command: &[String]) -> ExitCode {
    let spec = match LaunchSpec::from_config(config, command) {
        Ok(spec) => spec,
        Err(e) => {
            tracing::error!(error = %e, "Invalid service command");
            return ExitCode::from(CONFIG_ERROR_EXIT);
        }
    };

    let err = match Launcher::new(spec).prepare() {
        Ok(prepared) => prepared.exec(),
        Err(e) => e,
    };
    tracing::error!(error = %err, "Service not started");
    ExitCode::from(err.exit_code())
}

async fn run(config: &WardenConfig, command: &[String]) -> ExitCode {
    let spec = match LaunchSpec::from_config(config, command) {
        Ok(spec) => spec,
        Err(e) => {
            tracing::error!(error = %e, "Invalid service command");
            return ExitCode::from(CONFIG_ERROR_EXIT);
        }
    };

    let shutdown = Shutdown::new();
    signals::forward_to(shutdown.clone());
    init_metrics(config);

    let supervisor = Supervisor::new(Launcher::new(spec), ProbeConfig::from_config(config))
        .with_shutdown_timeout(Duration::from_secs(config.launcher.shutdown_timeout_secs))
        .with_reporters(reporters_for(config));

    match supervisor.run(&shutdown).await {
        Ok(status) => ExitCode::from(exit_code(status)),
        Err(e) => {
            tracing::error!(error = %e, "Service not started");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn probe(config: &WardenConfig) -> ExitCode {
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::forward_to(shutdown.clone());
    init_metrics(config);

    let status = HealthMonitor::new(ProbeConfig::from_config(config), Instant::now())
        .with_reporters(reporters_for(config))
        .run(stop)
        .await;

    tracing::info!(status = %status, "Health monitor stopped");
    ExitCode::SUCCESS
}

async fn check(config: &WardenConfig) -> ExitCode {
    let probe_config = ProbeConfig::from_config(config);
    let mut probe = TcpProbe::from_config(&probe_config);
    let report = check_once(&probe_config, &mut probe).await;

    match serde_json::to_string(&report) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::error!(error = %e, "Failed to encode report"),
    }

    if report.status == HealthStatus::Healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_metrics(config: &WardenConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(_) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}
