//! API handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::analysis::PatternAnalysis;
use crate::executor::{TierKind, TierStatus};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::observability::{EventLevel, TelemetryScope};
use crate::store::{total_quantity, FeedingEntry, FeedingStats, NewFeeding, ValidationError};

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct FeedingCreated {
    pub message: &'static str,
    pub id: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    pub output_path: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub message: &'static str,
    pub path: PathBuf,
    pub tier_used: TierKind,
    pub analysis: PatternAnalysis,
}

#[derive(Serialize)]
pub struct ExecutorStatus {
    pub tiers: Vec<TierStatus>,
    pub subprocess_timeout_secs: u64,
}

fn parse_body(body: &Bytes) -> Result<Value, ValidationError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Bird Feeding API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/feedings": "Add a new bird feeding record",
            "GET /api/feedings": "Get the most recent feeding records",
            "GET /api/stats": "Get feeding statistics",
            "POST /api/analyze": "Analyze feeding patterns",
            "POST /api/report": "Generate a feeding report",
            "GET /api/executor/status": "Show analysis execution tiers",
            "GET /health": "Liveness check",
        },
        "example_post_data": {
            "bird_type": "Robin",
            "food_type": "Seeds",
            "quantity": 25,
            "location": "Backyard feeder",
            "notes": "Morning feeding",
        },
    }))
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

pub async fn create_feeding(
    State(state): State<AppState>,
    scope: TelemetryScope,
    body: Bytes,
) -> Result<(StatusCode, Json<FeedingCreated>), ApiError> {
    let validated = parse_body(&body).and_then(|body| {
        let fields: Vec<&str> = body
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        scope.record_business_event(
            "feeding_request_received",
            json!({ "fields": fields }),
            EventLevel::Info,
        );
        NewFeeding::from_json(&body)
    });

    let feeding = match validated {
        Ok(feeding) => feeding,
        Err(e) => {
            tracing::warn!(correlation_id = %scope.correlation_id(), error = %e, "Rejected feeding");
            scope.record_business_event(
                "feeding_validation_failed",
                json!({ "error": e.to_string(), "field": e.field() }),
                EventLevel::Warning,
            );
            return Err(e.into());
        }
    };

    let arguments = json!({
        "bird_type": feeding.bird_type,
        "food_type": feeding.food_type,
        "quantity": feeding.quantity,
    });
    let entry = scope
        .track("feeding_stored", arguments, state.store.insert_async(feeding))
        .await?;

    scope.record_business_event(
        "feeding_created_successfully",
        json!({
            "feeding_id": entry.id,
            "bird_type": entry.bird_type,
            "food_type": entry.food_type,
            "quantity": entry.quantity,
            "location": entry.location,
        }),
        EventLevel::Info,
    );

    Ok((
        StatusCode::CREATED,
        Json(FeedingCreated {
            message: "Feeding recorded successfully",
            id: entry.id,
            timestamp: entry.feeding_time,
        }),
    ))
}

pub async fn list_feedings(
    State(state): State<AppState>,
    scope: TelemetryScope,
) -> Json<Vec<FeedingEntry>> {
    let entries = state.store.list(state.config.storage.list_limit);

    let unique_birds: HashSet<&str> = entries.iter().map(|e| e.bird_type.as_str()).collect();
    scope.record_business_event(
        "feedings_retrieved",
        json!({
            "total_records": entries.len(),
            "unique_birds": unique_birds.len(),
            "total_quantity": total_quantity(&entries),
        }),
        EventLevel::Info,
    );

    Json(entries)
}

pub async fn get_stats(State(state): State<AppState>, scope: TelemetryScope) -> Json<FeedingStats> {
    let stats = state.store.stats();
    scope.record_business_event(
        "stats_retrieved",
        json!({ "total_feedings": stats.total_feedings }),
        EventLevel::Info,
    );
    Json(stats)
}

pub async fn analyze(
    State(state): State<AppState>,
    scope: TelemetryScope,
) -> Result<Json<PatternAnalysis>, ApiError> {
    let records = state.store.records();
    let analysis = scope
        .track(
            "analyze_patterns",
            json!({ "records": records.len() }),
            state.analysis.analyze_patterns(records),
        )
        .await?;

    scope.record_business_event(
        "pattern_analysis_completed",
        json!({
            "tier_used": analysis.tier_used,
            "analysis_engine": analysis.analysis_engine,
            "recommendations": analysis.recommendations.len(),
        }),
        EventLevel::Info,
    );

    Ok(Json(analysis))
}

pub async fn generate_report(
    State(state): State<AppState>,
    scope: TelemetryScope,
    body: Bytes,
) -> Result<Json<ReportResponse>, ApiError> {
    let request: ReportRequest = match parse_body(&body)? {
        Value::Null => ReportRequest::default(),
        value => serde_json::from_value(value)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?,
    };
    let requested = request
        .output_path
        .unwrap_or_else(|| state.config.reports.default_path.clone());

    let records = state.store.records();
    let outcome = scope
        .track(
            "generate_report",
            json!({ "records": records.len(), "output_path": requested.display().to_string() }),
            state.analysis.generate_report(records, &requested),
        )
        .await?;

    scope.record_business_event(
        "report_generated",
        json!({
            "path": outcome.path.display().to_string(),
            "tier_used": outcome.analysis.tier_used,
        }),
        EventLevel::Info,
    );

    Ok(Json(ReportResponse {
        message: "Report generated successfully",
        path: outcome.path,
        tier_used: outcome.analysis.tier_used,
        analysis: outcome.analysis,
    }))
}

pub async fn executor_status(State(state): State<AppState>) -> Json<ExecutorStatus> {
    let executor = state.analysis.executor();
    Json(ExecutorStatus {
        tiers: executor.tier_status(),
        subprocess_timeout_secs: executor.subprocess_timeout().as_secs(),
    })
}
