//! Structured telemetry event record.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Correlation id used for events emitted outside any request.
pub const NO_REQUEST: &str = "no-request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// Event kind. Business events carry their own name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    HttpRequestStart,
    HttpRequestEnd,
    Error,
    Business(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::HttpRequestStart => "http_request_start",
            EventType::HttpRequestEnd => "http_request_end",
            EventType::Error => "error",
            EventType::Business(name) => name,
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One event, built and handed to the sink in a single step.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub event_type: EventType,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub payload: Map<String, Value>,
    pub service_name: String,
}

impl TelemetryEvent {
    pub fn new(
        event_type: EventType,
        correlation_id: &str,
        level: EventLevel,
        payload: Map<String, Value>,
        service_name: &str,
    ) -> Self {
        let correlation_id = if correlation_id.is_empty() {
            NO_REQUEST.to_string()
        } else {
            correlation_id.to_string()
        };
        Self {
            event_type,
            correlation_id,
            timestamp: Utc::now(),
            level,
            payload,
            service_name: service_name.to_string(),
        }
    }
}

/// Coerce caller-supplied data into an event payload without failing.
pub fn payload_from(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    }
}
