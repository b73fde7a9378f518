//! Request middleware.

pub mod telemetry;

pub use telemetry::{response_size, telemetry_middleware};
