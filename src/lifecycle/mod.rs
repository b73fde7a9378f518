//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Open store → Build executor and telemetry → Build state
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl+C / SIGTERM / trigger → Stop accepting → Drain → Flush store → Exit
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{build_state, open_store, StartupError};
