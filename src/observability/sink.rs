//! Event sinks.
//!
//! # Responsibilities
//! - Deliver one event to the collection endpoint or the local console
//! - Absorb every delivery failure (serialization, network, status)
//!
//! # Design Decisions
//! - `emit` is synchronous and infallible from the caller's side
//! - Remote delivery runs on a spawned task; callers never await it
//! - No retry, buffering, or backpressure

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::TelemetryConfig;
use crate::observability::event::TelemetryEvent;
use crate::observability::metrics;

/// Destination for telemetry events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

/// Wire form: the event plus deployment identity fields.
#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    event: &'a TelemetryEvent,
    customer_id: &'a str,
    environment: &'a str,
}

fn fallback_log(event: &TelemetryEvent, reason: &str) {
    tracing::warn!(
        target: "telemetry",
        event_type = %event.event_type.as_str(),
        correlation_id = %event.correlation_id,
        reason = %reason,
        "Telemetry delivery failed"
    );
}

/// Writes events to the `telemetry` log target.
pub struct ConsoleSink {
    customer_id: String,
    environment: String,
}

impl ConsoleSink {
    pub fn new(customer_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            environment: environment.into(),
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: TelemetryEvent) {
        let envelope = Envelope {
            event: &event,
            customer_id: &self.customer_id,
            environment: &self.environment,
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => tracing::info!(target: "telemetry", "{}", json),
            Err(e) => fallback_log(&event, &e.to_string()),
        }
    }
}

/// POSTs events as JSON to a collection URL.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    customer_id: String,
    environment: String,
}

impl HttpSink {
    pub fn new(
        url: impl Into<String>,
        customer_id: impl Into<String>,
        environment: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            customer_id: customer_id.into(),
            environment: environment.into(),
        })
    }
}

impl EventSink for HttpSink {
    fn emit(&self, event: TelemetryEvent) {
        let envelope = Envelope {
            event: &event,
            customer_id: &self.customer_id,
            environment: &self.environment,
        };
        let body = match serde_json::to_vec(&envelope) {
            Ok(body) => body,
            Err(e) => {
                fallback_log(&event, &e.to_string());
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            fallback_log(&event, "no async runtime for delivery");
            return;
        };

        let request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        runtime.spawn(async move {
            let outcome = match request.send().await {
                Ok(response) => response.error_for_status().map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                metrics::record_delivery_failure();
                fallback_log(&event, &e.to_string());
            }
        });
    }
}

/// Keeps every event in memory. Used to inspect emission in tests and tooling.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Build the sink the configuration asks for.
pub fn sink_from_config(config: &TelemetryConfig) -> Arc<dyn EventSink> {
    if let Some(url) = &config.collect_url {
        match HttpSink::new(
            url.clone(),
            config.customer_id.clone(),
            config.environment.clone(),
            Duration::from_secs(config.delivery_timeout_secs),
        ) {
            Ok(sink) => return Arc::new(sink),
            Err(e) => {
                tracing::error!(error = %e, url = %url, "Failed to build telemetry HTTP client, using console");
            }
        }
    }
    Arc::new(ConsoleSink::new(
        config.customer_id.clone(),
        config.environment.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::event::{EventLevel, EventType};
    use axum::{extract::State, routing::post, Json, Router};
    use serde_json::{Map, Value};
    use tokio::sync::mpsc;

    fn event(name: &str) -> TelemetryEvent {
        TelemetryEvent::new(
            EventType::Business(name.into()),
            "cid-1",
            EventLevel::Info,
            Map::new(),
            "svc",
        )
    }

    #[tokio::test]
    async fn test_http_sink_posts_envelope() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let app = Router::new()
            .route(
                "/collect",
                post(|State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                    let _ = tx.send(body);
                }),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let sink = HttpSink::new(
            format!("http://{}/collect", addr),
            "acme",
            "staging",
            Duration::from_secs(2),
        )
        .unwrap();
        sink.emit(event("feeding_created"));

        let body = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["event_type"], "feeding_created");
        assert_eq!(body["correlation_id"], "cid-1");
        assert_eq!(body["customer_id"], "acme");
        assert_eq!(body["environment"], "staging");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_does_not_panic() {
        let sink = HttpSink::new("http://127.0.0.1:1/collect", "demo", "dev", Duration::from_millis(200)).unwrap();
        sink.emit(event("lost"));
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    #[test]
    fn test_http_sink_without_runtime_is_silent() {
        let sink = HttpSink::new("http://127.0.0.1:1/collect", "demo", "dev", Duration::from_millis(200)).unwrap();
        sink.emit(event("no-runtime"));
    }

    #[test]
    fn test_memory_and_console_sinks() {
        let sink = MemorySink::new();
        sink.emit(event("a"));
        sink.emit(event("b"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[1].event_type.as_str(), "b");

        // Console when no URL is configured; emitting must not panic.
        sink_from_config(&TelemetryConfig::default()).emit(event("console"));
    }
}
