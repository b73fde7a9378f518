//! Bird feeding record service.
//!
//! Records feedings, analyzes feeding patterns through a tiered task
//! executor, and emits structured request telemetry.

// Core subsystems
pub mod analysis;
pub mod config;
pub mod executor;
pub mod http;
pub mod store;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use executor::TaskExecutor;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
