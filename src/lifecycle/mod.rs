//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! launch (launcher.rs):
//!     Resolve identity → Drop privileges (privileges.rs) → chdir/env → exec service
//!
//! run (supervise.rs):
//!     Drop privileges → Spawn service → Start health monitor
//!     → Wait for service exit or termination signal
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown broadcast (shutdown.rs)
//!     → Forward SIGTERM to service → SIGKILL after grace period
//! ```
//!
//! # Design Decisions
//! - Fail fast: an identity that cannot be assumed is fatal and never retried
//! - Privileges are dropped before the service or the monitor starts
//! - The launcher does not wait for the service port to open

pub mod launcher;
pub mod privileges;
pub mod shutdown;
pub mod signals;
pub mod supervise;

pub use launcher::{LaunchError, LaunchSpec, Launcher, PreparedLaunch};
pub use privileges::{Credentials, Identity, PrivilegeDrop, PrivilegeError, SystemPrivileges};
pub use shutdown::{Shutdown, StopReason};
pub use supervise::{exit_code, Supervisor};
