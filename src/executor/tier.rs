//! Tier trait definitions.
//!
//! A tier is one ranked strategy for running an analysis task. The
//! executor walks its tiers in order and returns the first success.

use async_trait::async_trait;
use serde::Serialize;

use crate::executor::types::{ExecutionError, TaskRequest, TaskResult, TierFailure, TierKind};

/// A task plus its payload already encoded as a JSON array.
///
/// Encoding happens once per execution so every tier sees identical bytes.
#[derive(Debug, Clone)]
pub struct PreparedTask {
    pub request: TaskRequest,
    pub encoded_payload: Vec<u8>,
}

impl PreparedTask {
    pub fn prepare(request: TaskRequest) -> Result<Self, ExecutionError> {
        let encoded_payload = serde_json::to_vec(&request.payload).map_err(|e| {
            ExecutionError::ExecutionFailed(format!("payload serialization failed: {e}"))
        })?;
        Ok(Self {
            request,
            encoded_payload,
        })
    }

    pub fn task_name(&self) -> &str {
        &self.request.task_name
    }
}

/// Point-in-time description of a tier for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TierStatus {
    pub tier: TierKind,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Trait for execution tiers.
///
/// Implementations never panic on bad input; every problem is reported as
/// a [`TierFailure`] so the executor can move on to the next tier.
#[async_trait]
pub trait Tier: Send + Sync {
    /// Which tier this is. The executor stamps this onto returned results.
    fn kind(&self) -> TierKind;

    /// Run the task.
    async fn run(&self, task: &PreparedTask) -> Result<TaskResult, TierFailure>;

    /// Current readiness of the tier.
    fn status(&self) -> TierStatus;
}
