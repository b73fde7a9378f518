//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, telemetry, timeout)
//! - Bind the server to a listener and serve until shutdown

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::analysis::AnalysisService;
use crate::config::ServiceConfig;
use crate::executor::TaskExecutor;
use crate::http::handlers;
use crate::http::middleware::telemetry_middleware;
use crate::observability::Telemetry;
use crate::store::FeedingStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub telemetry: Arc<Telemetry>,
    pub analysis: AnalysisService,
    pub store: FeedingStore,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        telemetry: Arc<Telemetry>,
        executor: Arc<TaskExecutor>,
        store: FeedingStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            telemetry,
            analysis: AnalysisService::new(executor),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<Telemetry> {
    fn from_ref(state: &AppState) -> Self {
        state.telemetry.clone()
    }
}

/// HTTP server for the feeding API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);
        let telemetry = state.telemetry.clone();

        Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route(
                "/api/feedings",
                post(handlers::create_feeding).get(handlers::list_feedings),
            )
            .route("/api/stats", get(handlers::get_stats))
            .route("/api/analyze", post(handlers::analyze))
            .route("/api/report", post(handlers::generate_report))
            .route("/api/executor/status", get(handlers::executor_status))
            .with_state(state)
            // Telemetry sits outside the timeout so a 408 still closes the span.
            .layer(TimeoutLayer::new(request_timeout))
            .layer(middleware::from_fn_with_state(telemetry, telemetry_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Router with all layers, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            telemetry_enabled = self.state.telemetry.is_enabled(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
