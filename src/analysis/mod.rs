//! Feeding pattern analysis and report generation.

pub mod report;
pub mod service;
pub mod types;

pub use report::{render_report, resolve_output_path, write_report, write_report_async, ReportError};
pub use service::AnalysisService;
pub use types::{AnalysisError, AnalysisResult, PatternAnalysis, ReportOutcome};
