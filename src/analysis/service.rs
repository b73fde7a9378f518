//! Analysis facade over the task executor.

use chrono::Utc;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::analysis::report::{render_report, write_report_async};
use crate::analysis::types::{AnalysisResult, PatternAnalysis, ReportOutcome};
use crate::executor::{FeedingRecord, TaskExecutor, TaskRequest, TaskResult, PATTERN_ANALYSIS, REPORT_GENERATION};

/// Always appended after tier-supplied recommendations.
const STANDING_RECOMMENDATIONS: &[&str] = &[
    "Consider increasing seed variety for better bird diversity",
    "Keep feeders clean and refill them before they run empty",
];

/// Runs the pattern analysis and report generation tasks.
#[derive(Clone)]
pub struct AnalysisService {
    executor: Arc<TaskExecutor>,
}

impl AnalysisService {
    pub fn new(executor: Arc<TaskExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.executor
    }

    /// Analyze feeding patterns over `records`.
    pub async fn analyze_patterns(&self, records: Vec<FeedingRecord>) -> AnalysisResult<PatternAnalysis> {
        let result = self
            .executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records))
            .await?;
        Ok(shape(result))
    }

    /// Analyze `records` and write a text report for `output_path`.
    pub async fn generate_report(
        &self,
        records: Vec<FeedingRecord>,
        output_path: &Path,
    ) -> AnalysisResult<ReportOutcome> {
        let result = self
            .executor
            .execute(TaskRequest::new(REPORT_GENERATION, records))
            .await?;
        let analysis = shape(result);

        let path = write_report_async(output_path.to_path_buf(), render_report(&analysis)).await?;
        tracing::info!(path = %path.display(), tier = %analysis.tier_used, "Report generated");

        Ok(ReportOutcome { path, analysis })
    }
}

fn text_field(data: &Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string()
}

/// Recommendations derived from the numeric summary.
fn derived_recommendations(patterns: &Value) -> Vec<String> {
    let mut derived = Vec::new();
    match patterns.get("total_feedings").and_then(Value::as_u64) {
        Some(0) | None => {
            derived.push("Record more feedings to build a reliable pattern history".to_string());
            return derived;
        }
        Some(_) => {}
    }
    if let (Some(bird), Some(food)) = (
        patterns.get("most_common_bird").and_then(Value::as_str),
        patterns.get("preferred_food").and_then(Value::as_str),
    ) {
        derived.push(format!("{bird} is the most frequent visitor and is most often fed {food}"));
    }
    if let Some(avg) = patterns.get("average_quantity").and_then(Value::as_f64) {
        if avg < 10.0 {
            derived.push(format!("Average portion is {avg:.1}; larger portions may attract more visitors"));
        }
    }
    derived
}

fn shape(result: TaskResult) -> PatternAnalysis {
    let TaskResult { tier_used, data, .. } = result;

    let patterns = data.get("patterns").cloned().unwrap_or(Value::Object(Map::new()));

    let mut recommendations: Vec<String> = data
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|recs| {
            recs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let extra = derived_recommendations(&patterns)
        .into_iter()
        .chain(STANDING_RECOMMENDATIONS.iter().map(|s| s.to_string()));
    for rec in extra {
        if !recommendations.contains(&rec) {
            recommendations.push(rec);
        }
    }

    PatternAnalysis {
        patterns,
        recommendations,
        analysis_engine: text_field(&data, "analysis_engine"),
        processed_by: text_field(&data, "processed_by"),
        tier_used,
        timestamp: Utc::now(),
    }
}
