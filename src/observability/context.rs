//! Process-scoped telemetry context and request-scoped spans.
//!
//! # Lifecycle
//! ```text
//! Telemetry      built once at startup, shared via Arc
//! RequestSpan    OPEN at request ingress → CLOSED at egress (exactly once)
//! TelemetryScope handle given to handlers; bound to a span's correlation
//!                id, or detached with `no-request`
//! ```

use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::observability::event::{payload_from, EventLevel, EventType, TelemetryEvent, NO_REQUEST};
use crate::observability::sink::{sink_from_config, EventSink};

/// Argument keys never forwarded in tracked-action events.
const REDACTED_KEYS: &[&str] = &["password", "token", "api_key"];

/// Milliseconds rounded to two decimals.
pub fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Process-wide telemetry settings and sink.
pub struct Telemetry {
    enabled: bool,
    service_name: String,
    sink: Arc<dyn EventSink>,
}

impl Telemetry {
    pub fn new(enabled: bool, service_name: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            enabled,
            service_name: service_name.into(),
            sink,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        let sink = sink_from_config(config);
        Self::new(config.enabled, config.service_name.clone(), sink)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Scope with the `no-request` correlation id.
    pub fn detached(self: &Arc<Self>) -> TelemetryScope {
        TelemetryScope {
            telemetry: Arc::clone(self),
            correlation_id: Arc::from(NO_REQUEST),
        }
    }

    fn emit(&self, event_type: EventType, correlation_id: &str, level: EventLevel, payload: Map<String, Value>) {
        if !self.enabled {
            return;
        }
        self.sink.emit(TelemetryEvent::new(
            event_type,
            correlation_id,
            level,
            payload,
            &self.service_name,
        ));
    }
}

/// Request metadata captured at ingress.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub method: String,
    pub path: String,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
}

/// Response metadata captured at egress.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMetadata {
    pub status: u16,
    pub size: u64,
}

/// Correlation state for one request.
///
/// Emits `http_request_start` on open and `http_request_end` exactly once:
/// through [`RequestSpan::close`], or from `Drop` when the request future is
/// abandoned before a response exists.
pub struct RequestSpan {
    telemetry: Arc<Telemetry>,
    correlation_id: Arc<str>,
    start_time: Instant,
    method: String,
    path: String,
    closed: bool,
}

impl RequestSpan {
    pub fn open(telemetry: Arc<Telemetry>, request: RequestMetadata) -> Self {
        let correlation_id: Arc<str> = Arc::from(Uuid::new_v4().to_string());

        telemetry.emit(
            EventType::HttpRequestStart,
            &correlation_id,
            EventLevel::Info,
            payload_from(json!({
                "method": request.method,
                "path": request.path,
                "remote_addr": request.client_addr,
                "user_agent": request.user_agent.unwrap_or_default(),
            })),
        );

        Self {
            telemetry,
            correlation_id,
            start_time: Instant::now(),
            method: request.method,
            path: request.path,
            closed: false,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Handle for code running inside this request.
    pub fn scope(&self) -> TelemetryScope {
        TelemetryScope {
            telemetry: Arc::clone(&self.telemetry),
            correlation_id: Arc::clone(&self.correlation_id),
        }
    }

    pub fn close(mut self, response: ResponseMetadata) {
        self.emit_end(json!({
            "status_code": response.status,
            "response_size": response.size,
        }));
    }

    fn emit_end(&mut self, outcome: Value) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut payload = payload_from(outcome);
        payload.insert("method".into(), json!(self.method));
        payload.insert("path".into(), json!(self.path));
        payload.insert("duration_ms".into(), json!(elapsed_ms(self.start_time)));

        self.telemetry.emit(
            EventType::HttpRequestEnd,
            &self.correlation_id,
            EventLevel::Info,
            payload,
        );
    }
}

impl Drop for RequestSpan {
    fn drop(&mut self) {
        self.emit_end(json!({
            "status_code": Value::Null,
            "response_size": 0,
            "aborted": true,
        }));
    }
}

/// Recording handle bound to one correlation id.
#[derive(Clone)]
pub struct TelemetryScope {
    telemetry: Arc<Telemetry>,
    correlation_id: Arc<str>,
}

impl TelemetryScope {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn record_business_event(&self, event_type: &str, data: Value, level: EventLevel) {
        if !self.telemetry.is_enabled() {
            return;
        }
        self.telemetry.emit(
            EventType::Business(event_type.to_string()),
            &self.correlation_id,
            level,
            payload_from(data),
        );
    }

    pub fn record_error<E>(&self, error: &E, context: Value)
    where
        E: std::error::Error + ?Sized,
    {
        if !self.telemetry.is_enabled() {
            return;
        }
        let mut payload = Map::new();
        payload.insert("error_type".into(), json!(short_type_name::<E>()));
        payload.insert("error_message".into(), json!(error.to_string()));
        payload.insert("context".into(), Value::Object(payload_from(context)));

        self.telemetry.emit(
            EventType::Error,
            &self.correlation_id,
            EventLevel::Error,
            payload,
        );
    }

    /// Time an action and record its outcome.
    ///
    /// Success emits `event_type` with duration and redacted arguments;
    /// failure emits an `error` event. The action's result is returned as is.
    pub async fn track<T, E, F>(&self, event_type: &str, arguments: Value, action: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let start = Instant::now();
        let outcome = action.await;
        if !self.telemetry.is_enabled() {
            return outcome;
        }

        match &outcome {
            Ok(_) => {
                let mut data = Map::new();
                data.insert("function".into(), json!(event_type));
                data.insert("duration_ms".into(), json!(elapsed_ms(start)));
                data.insert("success".into(), json!(true));
                let mut arguments = payload_from(arguments);
                arguments.retain(|key, _| !REDACTED_KEYS.contains(&key.as_str()));
                if !arguments.is_empty() {
                    data.insert("arguments".into(), Value::Object(arguments));
                }
                self.record_business_event(event_type, Value::Object(data), EventLevel::Info);
            }
            Err(error) => {
                self.record_error(
                    error,
                    json!({
                        "function": event_type,
                        "duration_ms": elapsed_ms(start),
                    }),
                );
            }
        }
        outcome
    }
}
