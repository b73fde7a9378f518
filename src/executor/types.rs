//! Task request/result types and executor errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Task name for pattern analysis.
pub const PATTERN_ANALYSIS: &str = "pattern_analysis";

/// Task name for report generation.
pub const REPORT_GENERATION: &str = "report_generation";

/// One feeding record as exchanged with analysis tiers.
///
/// Missing fields deserialize to their empty values so partially filled
/// records from external sources are still analyzable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedingRecord {
    pub bird_type: String,
    pub food_type: String,
    pub quantity: i64,
    pub location: String,
    pub notes: String,
    pub feeding_time: String,
}

impl FeedingRecord {
    pub fn new(bird_type: impl Into<String>, food_type: impl Into<String>, quantity: i64) -> Self {
        Self {
            bird_type: bird_type.into(),
            food_type: food_type.into(),
            quantity,
            ..Default::default()
        }
    }
}

/// A named task plus its ordered payload.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub task_name: String,
    pub payload: Vec<FeedingRecord>,
}

impl TaskRequest {
    pub fn new(task_name: impl Into<String>, payload: Vec<FeedingRecord>) -> Self {
        Self {
            task_name: task_name.into(),
            payload,
        }
    }
}

/// Execution tier identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierKind {
    NativeBridge,
    Subprocess,
    Simulation,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::NativeBridge => "NATIVE_BRIDGE",
            TierKind::Subprocess => "SUBPROCESS",
            TierKind::Simulation => "SIMULATION",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one task execution.
///
/// Construct through [`TaskResult::succeeded`] or [`TaskResult::failed`];
/// an unsuccessful result always has empty `data` and a set `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub tier_used: TierKind,
    pub success: bool,
    pub data: Map<String, Value>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn succeeded(tier_used: TierKind, data: Map<String, Value>) -> Self {
        Self {
            tier_used,
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(tier_used: TierKind, error: impl Into<String>) -> Self {
        Self {
            tier_used,
            success: false,
            data: Map::new(),
            error: Some(error.into()),
        }
    }
}

/// Tier-local failure. Always recovered by the executor.
#[derive(Debug, Error)]
pub enum TierFailure {
    /// The tier is not usable in this process (not configured, failed init).
    #[error("tier unavailable: {0}")]
    Unavailable(String),

    /// The tier ran and failed.
    #[error("tier runtime error: {0}")]
    Runtime(String),

    /// The tier exceeded its deadline.
    #[error("tier timed out after {0} seconds")]
    Timeout(u64),

    /// The tier produced output that could not be interpreted.
    #[error("malformed tier output: {0}")]
    MalformedOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`TaskExecutor`](crate::executor::TaskExecutor).
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Fatal for the current operation; never downgraded to simulation.
    #[error("task execution failed: {0}")]
    ExecutionFailed(String),
}

/// Result type for executor operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;
