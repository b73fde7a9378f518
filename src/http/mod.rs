//! HTTP surface of the feeding service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout and trace layers)
//!     → middleware/telemetry.rs (request span, correlation id)
//!     → handlers.rs (validation, store, analysis)
//!     → error.rs (failures rendered as JSON)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};

/// Response header carrying the request's correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";
