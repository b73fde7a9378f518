//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) ──┐
//! remote artifact ─────┼→ loader.rs (first available source wins)
//! built-in defaults ───┘
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError, ConfigSource, ResolvedConfig};
pub use schema::ServiceConfig;
pub use schema::{
    ExecutorConfig, ListenerConfig, MetricsConfig, ReportConfig, StorageConfig,
    TelemetryConfig, TimeoutConfig,
};
