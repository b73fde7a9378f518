//! Analysis response types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use crate::analysis::report::ReportError;
use crate::executor::{ExecutionError, TierKind};

/// Domain-shaped analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct PatternAnalysis {
    /// Numeric summary produced by the executing tier.
    pub patterns: Value,
    /// Tier-supplied recommendations followed by derived ones.
    pub recommendations: Vec<String>,
    pub analysis_engine: String,
    pub processed_by: String,
    /// Tier that produced the result.
    pub tier_used: TierKind,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a report run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    /// Path actually written.
    pub path: PathBuf,
    pub analysis: PatternAnalysis,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
