//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use feeding_api::config::{ExecutorConfig, ServiceConfig};
use feeding_api::executor::TaskExecutor;
use feeding_api::http::{AppState, HttpServer};
use feeding_api::lifecycle::Shutdown;
use feeding_api::observability::{MemorySink, Telemetry};
use feeding_api::store::FeedingStore;

/// App state with an in-memory store and a recording sink.
pub fn test_state(telemetry_enabled: bool, executor: ExecutorConfig) -> (AppState, Arc<MemorySink>) {
    let sink = MemorySink::new();
    let telemetry = Arc::new(Telemetry::new(telemetry_enabled, "bird-feeding-api", sink.clone()));
    let executor = Arc::new(TaskExecutor::from_config(&executor));

    let mut config = ServiceConfig::default();
    config.telemetry.enabled = telemetry_enabled;
    let state = AppState::new(config, telemetry, executor, FeedingStore::new(None));
    (state, sink)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `state` on an ephemeral port until the returned trigger fires.
pub async fn start_server(state: AppState) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let mut rx = shutdown.subscribe();

    let server = HttpServer::new(state);
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = rx.recv().await;
            })
            .await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Write a shell script to be run as `/bin/sh <script> <exchange-file>`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Executor config that runs `script` through `/bin/sh`, with the native
/// bridge disabled so the subprocess tier is tried first.
pub fn script_executor(script: &Path, exchange_dir: &Path, timeout_secs: u64) -> ExecutorConfig {
    ExecutorConfig {
        task_binary_path: Some(PathBuf::from("/bin/sh")),
        launcher_args: vec![script.to_string_lossy().into_owned()],
        max_subprocess_seconds: timeout_secs,
        native_bridge_enabled: false,
        exchange_dir: Some(exchange_dir.to_path_buf()),
    }
}

pub const ROBIN: &str = r#"{"bird_type": "Robin", "food_type": "Seeds", "quantity": 25, "location": "Backyard feeder"}"#;
