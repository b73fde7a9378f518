//! Text report rendering and writing.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::types::PatternAnalysis;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Report writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Render the analysis as a UTF-8 text document.
pub fn render_report(analysis: &PatternAnalysis) -> String {
    let patterns = serde_json::to_string_pretty(&analysis.patterns)
        .unwrap_or_else(|_| analysis.patterns.to_string());
    let recommendations = analysis
        .recommendations
        .iter()
        .map(|rec| format!("• {rec}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Bird Feeding Analysis Report\n\
         Generated by {engine}\n\
         \n\
         === FEEDING PATTERNS ===\n\
         {patterns}\n\
         \n\
         === RECOMMENDATIONS ===\n\
         {recommendations}\n\
         \n\
         === METADATA ===\n\
         Analysis Engine: {engine}\n\
         Processed By: {processed_by}\n\
         Execution Tier: {tier}\n\
         Generated: {generated}\n",
        engine = analysis.analysis_engine,
        processed_by = analysis.processed_by,
        tier = analysis.tier_used,
        generated = analysis.timestamp.to_rfc3339(),
    )
}

/// Where a report for `requested` actually lands.
///
/// Reports are plain text, so a `.pdf` destination becomes a `.txt` sibling.
pub fn resolve_output_path(requested: &Path) -> PathBuf {
    let is_pdf = requested
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if is_pdf {
        requested.with_extension("txt")
    } else {
        requested.to_path_buf()
    }
}

/// Write `contents` for `requested`, creating parent directories.
///
/// Returns the path written. Failures are returned as is.
pub fn write_report(requested: &Path, contents: &str) -> Result<PathBuf, ReportError> {
    let path = resolve_output_path(requested);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, contents).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// [`write_report`] on the blocking pool.
pub async fn write_report_async(requested: PathBuf, contents: String) -> Result<PathBuf, ReportError> {
    tokio::task::spawn_blocking(move || write_report(&requested, &contents)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TierKind;
    use chrono::Utc;
    use serde_json::json;

    fn analysis() -> PatternAnalysis {
        PatternAnalysis {
            patterns: json!({"most_common_bird": "Robin", "total_feedings": 3}),
            recommendations: vec!["Refill seeds weekly".into(), "Add a water source".into()],
            analysis_engine: "Local Pattern Simulator v1.0".into(),
            processed_by: "Simulation".into(),
            tier_used: TierKind::Simulation,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_render_sections() {
        let text = render_report(&analysis());
        let patterns = text.find("=== FEEDING PATTERNS ===").unwrap();
        let recs = text.find("=== RECOMMENDATIONS ===").unwrap();
        let meta = text.find("=== METADATA ===").unwrap();
        assert!(patterns < recs && recs < meta);

        assert!(text.contains("\"most_common_bird\": \"Robin\""));
        assert!(text.contains("• Refill seeds weekly\n• Add a water source"));
        assert!(text.contains("Execution Tier: SIMULATION"));
    }

    #[test]
    fn test_pdf_becomes_txt() {
        assert_eq!(resolve_output_path(Path::new("out/report.pdf")), PathBuf::from("out/report.txt"));
        assert_eq!(resolve_output_path(Path::new("out/report.PDF")), PathBuf::from("out/report.txt"));
        assert_eq!(resolve_output_path(Path::new("report.md")), PathBuf::from("report.md"));
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("nested/deeper/report.pdf");

        let written = write_report(&requested, "hello").unwrap();
        assert_eq!(written, dir.path().join("nested/deeper/report.txt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "hello");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let err = write_report(&blocker.join("report.txt"), "x").unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn test_async_write_matches_blocking_write() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("async/report.pdf");

        let written = write_report_async(requested, render_report(&analysis())).await.unwrap();
        assert_eq!(written, dir.path().join("async/report.txt"));
        assert!(fs::read_to_string(written).unwrap().starts_with("Bird Feeding Analysis Report"));
    }

    #[tokio::test]
    async fn test_async_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let err = write_report_async(blocker.join("report.txt"), "x".into()).await.unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
    }
}
