//! Request telemetry middleware.
//!
//! # Responsibilities
//! - Open a [`RequestSpan`] at ingress and close it at egress
//! - Expose the request's [`TelemetryScope`] to handlers
//! - Echo the correlation id in the `x-request-id` response header
//! - Record request metrics whether or not telemetry is enabled
//!
//! # Design Decisions
//! - Disabled telemetry skips span creation entirely
//! - A response is never altered beyond the added header

use axum::{
    body::{Body, HttpBody},
    extract::{ConnectInfo, FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, Request, Response},
    middleware::Next,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::observability::{RequestMetadata, RequestSpan, ResponseMetadata, Telemetry, TelemetryScope};

/// Best-effort response size: `Content-Length`, then the body's exact size, else 0.
pub fn response_size<B: HttpBody>(response: &Response<B>) -> u64 {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}

pub async fn telemetry_middleware(
    State(telemetry): State<Arc<Telemetry>>,
    mut req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().to_string();

    if !telemetry.is_enabled() {
        let response = next.run(req).await;
        metrics::record_request(&method, response.status().as_u16(), start);
        return response;
    }

    let metadata = RequestMetadata {
        method: method.clone(),
        path: req.uri().path().to_string(),
        client_addr: req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string()),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    // Dropped without close if the request future is abandoned.
    let span = RequestSpan::open(telemetry, metadata);
    req.extensions_mut().insert(span.scope());

    let mut response = next.run(req).await;
    let status = response.status().as_u16();

    if let Ok(value) = HeaderValue::from_str(span.correlation_id()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    tracing::debug!(
        correlation_id = %span.correlation_id(),
        method = %method,
        status = status,
        "Request completed"
    );

    let size = response_size(&response);
    span.close(ResponseMetadata { status, size });
    metrics::record_request(&method, status, start);

    response
}

/// Handlers take the request's scope, or a detached one when the
/// middleware did not run.
impl<S> FromRequestParts<S> for TelemetryScope
where
    Arc<Telemetry>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(scope) = parts.extensions.get::<TelemetryScope>() {
            return Ok(scope.clone());
        }
        Ok(Arc::<Telemetry>::from_ref(state).detached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{EventType, MemorySink, NO_REQUEST};
    use axum::{middleware, routing::get, Router};
    use futures_util::stream;
    use tower::ServiceExt;

    fn app(enabled: bool) -> (Router, Arc<MemorySink>) {
        let sink = MemorySink::new();
        let telemetry = Arc::new(Telemetry::new(enabled, "bird-feeding-api", sink.clone()));
        let router = Router::new()
            .route(
                "/scope",
                get(|scope: TelemetryScope| async move { scope.correlation_id().to_string() }),
            )
            .with_state(telemetry.clone())
            .layer(middleware::from_fn_with_state(telemetry, telemetry_middleware));
        (router, sink)
    }

    #[tokio::test]
    async fn test_header_matches_span() {
        let (router, sink) = app(true);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/scope")
                    .header(header::USER_AGENT, "test-agent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, header_id.as_bytes());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::HttpRequestStart);
        assert_eq!(events[0].payload["user_agent"], "test-agent");
        assert_eq!(events[1].payload["status_code"], 200);
        assert_eq!(events[1].payload["response_size"], header_id.len() as u64);
        assert!(events.iter().all(|e| e.correlation_id == header_id));
    }

    #[tokio::test]
    async fn test_disabled_is_passthrough() {
        let (router, sink) = app(false);
        let response = router
            .oneshot(Request::builder().uri("/scope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().get(X_REQUEST_ID).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, NO_REQUEST.as_bytes());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_response_size_sources() {
        let sized = Response::new(Body::from("hello"));
        assert_eq!(response_size(&sized), 5);

        let declared = Response::builder()
            .header(header::CONTENT_LENGTH, "12")
            .body(Body::empty())
            .unwrap();
        assert_eq!(response_size(&declared), 12);

        let chunks: Vec<Result<&'static str, Infallible>> = vec![Ok("a"), Ok("b")];
        let streamed = Response::new(Body::from_stream(stream::iter(chunks)));
        assert_eq!(response_size(&streamed), 0);
    }
}
