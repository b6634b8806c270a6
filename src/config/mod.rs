//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → overrides.rs (CLI flags / environment)
//!     → validation.rs (semantic checks)
//!     → WardenConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the probe never observes a change
//! - All fields have defaults so the warden runs with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use overrides::ConfigOverrides;
pub use schema::{
    HealthCheckConfig, LauncherConfig, ObservabilityConfig, ServiceConfig, WardenConfig,
};
