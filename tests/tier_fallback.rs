//! Analysis through the executor chain with stubbed external analyzers.

#![cfg(unix)]

use axum::http::StatusCode;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tower::ServiceExt;

use feeding_api::config::ExecutorConfig;
use feeding_api::http::HttpServer;

mod common;

const ANALYZER_OK: &str = r#"
test -s "$1" || exit 3
echo '{"patterns": {"most_common_bird": "Robin", "total_feedings": 1}, "recommendations": ["Hang a second feeder"], "analysis_engine": "Stub Analyzer", "processed_by": "Subprocess"}'
"#;

fn exchange_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("feeding-task-"))
        .count()
}

async fn seed(router: &axum::Router) {
    let response = router
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/feedings",
            serde_json::from_str(common::ROBIN).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn analyze(executor: ExecutorConfig) -> serde_json::Value {
    let (state, _sink) = common::test_state(true, executor);
    let router = HttpServer::new(state).router();
    seed(&router).await;

    let response = router
        .oneshot(common::empty_request("POST", "/api/analyze"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    common::body_json(response).await
}

#[tokio::test]
async fn test_subprocess_result_used() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(dir.path(), "ok.sh", ANALYZER_OK);

    let body = analyze(common::script_executor(&script, dir.path(), 10)).await;
    assert_eq!(body["tier_used"], "SUBPROCESS");
    assert_eq!(body["analysis_engine"], "Stub Analyzer");
    assert_eq!(body["recommendations"][0], "Hang a second feeder");
    assert_eq!(exchange_files(dir.path()), 0);
}

#[tokio::test]
async fn test_failing_subprocess_falls_back_to_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(dir.path(), "fail.sh", "echo boom >&2\nexit 1\n");

    let body = analyze(common::script_executor(&script, dir.path(), 10)).await;
    assert_eq!(body["tier_used"], "SIMULATION");
    assert_eq!(body["patterns"]["most_common_bird"], "Robin");
    assert_eq!(exchange_files(dir.path()), 0);
}

#[tokio::test]
async fn test_error_payload_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(
        dir.path(),
        "error.sh",
        "echo '{\"error\": \"license expired\", \"patterns\": {}}'\n",
    );

    let body = analyze(common::script_executor(&script, dir.path(), 10)).await;
    assert_eq!(body["tier_used"], "SIMULATION");
}

#[tokio::test]
async fn test_hung_subprocess_is_bounded_by_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(dir.path(), "hang.sh", "sleep 30\n");

    let start = Instant::now();
    let body = analyze(common::script_executor(&script, dir.path(), 1)).await;
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(body["tier_used"], "SIMULATION");
    assert_eq!(exchange_files(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_binary_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ExecutorConfig {
        task_binary_path: Some(dir.path().join("no-such-analyzer")),
        native_bridge_enabled: false,
        ..Default::default()
    };
    let body = analyze(executor).await;
    assert_eq!(body["tier_used"], "SIMULATION");
}

#[tokio::test]
async fn test_native_bridge_preferred_by_default() {
    let body = analyze(ExecutorConfig::default()).await;
    assert_eq!(body["tier_used"], "NATIVE_BRIDGE");
    assert_eq!(body["patterns"]["bird_diversity"], 1);
}

#[tokio::test]
async fn test_report_written_from_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(dir.path(), "fail.sh", "exit 2\n");
    let (state, sink) = common::test_state(true, common::script_executor(&script, dir.path(), 10));
    let router = HttpServer::new(state).router();
    seed(&router).await;

    let requested = dir.path().join("out/weekly.pdf");
    let response = router
        .oneshot(common::json_request(
            "POST",
            "/api/report",
            json!({ "output_path": requested }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["tier_used"], "SIMULATION");
    let written = dir.path().join("out/weekly.txt");
    assert_eq!(body["path"], json!(written));

    let text = std::fs::read_to_string(&written).unwrap();
    assert!(text.contains("=== FEEDING PATTERNS ==="));
    assert!(text.contains("Execution Tier: SIMULATION"));

    assert!(sink
        .events()
        .iter()
        .any(|e| e.event_type.as_str() == "report_generated"));
}

#[tokio::test]
async fn test_unwritable_report_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let (state, sink) = common::test_state(true, ExecutorConfig::default());
    let router = HttpServer::new(state).router();

    let response = router
        .oneshot(common::json_request(
            "POST",
            "/api/report",
            json!({ "output_path": blocker.join("report.txt") }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = sink
        .events()
        .into_iter()
        .find(|e| e.event_type.as_str() == "error")
        .unwrap();
    assert_eq!(error.payload["context"]["function"], "generate_report");
}

#[tokio::test]
async fn test_executor_status_lists_tiers() {
    let (state, _sink) = common::test_state(false, ExecutorConfig::default());
    let router = HttpServer::new(state).router();

    let response = router
        .oneshot(common::empty_request("GET", "/api/executor/status"))
        .await
        .unwrap();
    let body = common::body_json(response).await;
    let tiers: Vec<&str> = body["tiers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["tier"].as_str().unwrap())
        .collect();
    assert_eq!(tiers, vec!["NATIVE_BRIDGE", "SUBPROCESS", "SIMULATION"]);
    assert_eq!(body["subprocess_timeout_secs"], 30);
}
