//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! telemetry middleware / handlers
//!     → context.rs (Telemetry, RequestSpan, TelemetryScope)
//!     → event.rs   (TelemetryEvent with correlation id)
//!     → sink.rs    (HTTP collector or console, failures absorbed)
//!
//! All subsystems also produce:
//!     → logging.rs (diagnostic tracing output)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - One correlation id per request, shared by every event it emits
//! - Telemetry is a hard on/off switch held by the process-scoped context
//! - Telemetry never fails the request it observes

pub mod context;
pub mod event;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use context::{RequestMetadata, RequestSpan, ResponseMetadata, Telemetry, TelemetryScope};
pub use event::{EventLevel, EventType, TelemetryEvent, NO_REQUEST};
pub use sink::{ConsoleSink, EventSink, HttpSink, MemorySink};
