//! Tiered task execution subsystem.
//!
//! # Data Flow
//! ```text
//! TaskRequest
//!     → PreparedTask (payload encoded once; failure here is fatal)
//!     → native.rs      (in-process bridge, initialized once)
//!     → subprocess.rs  (external analyzer, hard timeout)
//!     → simulation.rs  (local summary, cannot fail)
//!     → TaskResult tagged with the tier that produced it
//! ```
//!
//! # Design Decisions
//! - Tiers are an explicit ordered list of trait objects
//! - Tier failures are logged and never surfaced to the caller
//! - A failed tier contributes nothing to the final result

pub mod native;
pub mod simulation;
pub mod subprocess;
pub mod tier;
pub mod types;

use std::time::{Duration, Instant};

use crate::config::ExecutorConfig;
use crate::observability::metrics;

pub use native::{BridgeLoader, BridgeState, NativeBridge, NativeBridgeTier};
pub use simulation::SimulationTier;
pub use subprocess::SubprocessTier;
pub use tier::{PreparedTask, Tier, TierStatus};
pub use types::{
    ExecutionError, ExecutionResult, FeedingRecord, TaskRequest, TaskResult, TierFailure,
    TierKind, PATTERN_ANALYSIS, REPORT_GENERATION,
};

/// Runs tasks through an ordered chain of tiers.
pub struct TaskExecutor {
    tiers: Vec<Box<dyn Tier>>,
    subprocess_timeout: Duration,
}

impl TaskExecutor {
    /// Standard chain: native bridge, subprocess, simulation.
    pub fn from_config(config: &ExecutorConfig) -> Self {
        let tiers: Vec<Box<dyn Tier>> = vec![
            Box::new(NativeBridgeTier::builtin(config.native_bridge_enabled)),
            Box::new(SubprocessTier::from_config(config)),
            Box::new(SimulationTier::new()),
        ];
        Self {
            tiers,
            subprocess_timeout: Duration::from_secs(config.max_subprocess_seconds),
        }
    }

    /// Custom chain, tried in the given order.
    pub fn with_tiers(tiers: Vec<Box<dyn Tier>>) -> Self {
        Self {
            tiers,
            subprocess_timeout: Duration::from_secs(ExecutorConfig::default().max_subprocess_seconds),
        }
    }

    pub fn subprocess_timeout(&self) -> Duration {
        self.subprocess_timeout
    }

    /// Execute a task, returning the first successful tier's result.
    ///
    /// Only fails when the payload cannot be encoded or when the chain has
    /// no tier left that succeeds.
    pub async fn execute(&self, request: TaskRequest) -> ExecutionResult<TaskResult> {
        let task = PreparedTask::prepare(request)?;
        let started = Instant::now();

        for tier in &self.tiers {
            let kind = tier.kind();
            match tier.run(&task).await {
                Ok(mut result) if result.success => {
                    result.tier_used = kind;
                    metrics::record_task_execution(task.task_name(), kind.as_str(), started);
                    tracing::info!(
                        task = %task.task_name(),
                        tier = %kind,
                        records = task.request.payload.len(),
                        "Task executed"
                    );
                    return Ok(result);
                }
                Ok(result) => {
                    metrics::record_tier_failure(kind.as_str());
                    tracing::warn!(
                        task = %task.task_name(),
                        tier = %kind,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Tier reported failure, falling back"
                    );
                }
                Err(TierFailure::Unavailable(reason)) => {
                    tracing::debug!(
                        task = %task.task_name(),
                        tier = %kind,
                        reason = %reason,
                        "Tier unavailable, skipping"
                    );
                }
                Err(failure) => {
                    metrics::record_tier_failure(kind.as_str());
                    tracing::warn!(
                        task = %task.task_name(),
                        tier = %kind,
                        error = %failure,
                        "Tier failed, falling back"
                    );
                }
            }
        }

        Err(ExecutionError::ExecutionFailed(format!(
            "no execution tier succeeded for task '{}'",
            task.task_name()
        )))
    }

    /// Status of every tier in chain order.
    pub fn tier_status(&self) -> Vec<TierStatus> {
        self.tiers.iter().map(|tier| tier.status()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fault-injection tier.
    struct ScriptedTier {
        kind: TierKind,
        outcome: fn() -> Result<TaskResult, TierFailure>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTier {
        fn boxed(
            kind: TierKind,
            outcome: fn() -> Result<TaskResult, TierFailure>,
        ) -> (Box<dyn Tier>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let tier = Self {
                kind,
                outcome,
                calls: calls.clone(),
            };
            (Box::new(tier), calls)
        }
    }

    #[async_trait]
    impl Tier for ScriptedTier {
        fn kind(&self) -> TierKind {
            self.kind
        }

        async fn run(&self, _task: &PreparedTask) -> Result<TaskResult, TierFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        fn status(&self) -> TierStatus {
            TierStatus {
                tier: self.kind,
                state: "scripted",
                detail: None,
            }
        }
    }

    fn records() -> Vec<FeedingRecord> {
        vec![
            FeedingRecord::new("Robin", "Seeds", 25),
            FeedingRecord::new("Cardinal", "Nuts", 30),
        ]
    }

    fn partial_data() -> Map<String, serde_json::Value> {
        let mut data = Map::new();
        data.insert("partial".into(), json!(true));
        data
    }

    #[tokio::test]
    async fn test_simulation_answers_when_other_tiers_fail() {
        let (native, _) = ScriptedTier::boxed(TierKind::NativeBridge, || {
            Err(TierFailure::Runtime("bridge crashed".into()))
        });
        let (subprocess, _) = ScriptedTier::boxed(TierKind::Subprocess, || {
            Err(TierFailure::Timeout(30))
        });
        let executor = TaskExecutor::with_tiers(vec![native, subprocess, Box::new(SimulationTier::new())]);

        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records()))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.tier_used, TierKind::Simulation);
        assert!(!result.data.contains_key("partial"));
        assert_eq!(result.data["patterns"]["total_feedings"], json!(2));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let (native, native_calls) = ScriptedTier::boxed(TierKind::NativeBridge, || {
            Ok(TaskResult::succeeded(TierKind::NativeBridge, partial_data()))
        });
        let (subprocess, subprocess_calls) = ScriptedTier::boxed(TierKind::Subprocess, || {
            Ok(TaskResult::succeeded(TierKind::Subprocess, Map::new()))
        });
        let executor = TaskExecutor::with_tiers(vec![native, subprocess]);

        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records()))
            .await
            .unwrap();

        assert_eq!(result.tier_used, TierKind::NativeBridge);
        assert_eq!(native_calls.load(Ordering::SeqCst), 1);
        assert_eq!(subprocess_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsuccessful_result_falls_through() {
        let (native, _) = ScriptedTier::boxed(TierKind::NativeBridge, || {
            Ok(TaskResult::failed(TierKind::NativeBridge, "unsupported task"))
        });
        let executor = TaskExecutor::with_tiers(vec![native, Box::new(SimulationTier::new())]);

        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records()))
            .await
            .unwrap();
        assert_eq!(result.tier_used, TierKind::Simulation);
    }

    #[tokio::test]
    async fn test_tier_used_reflects_producing_tier() {
        // A tier mislabelling its result is corrected by the executor.
        let (subprocess, _) = ScriptedTier::boxed(TierKind::Subprocess, || {
            Ok(TaskResult::succeeded(TierKind::Simulation, Map::new()))
        });
        let executor = TaskExecutor::with_tiers(vec![subprocess]);

        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records()))
            .await
            .unwrap();
        assert_eq!(result.tier_used, TierKind::Subprocess);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_execution_failed() {
        let (subprocess, _) = ScriptedTier::boxed(TierKind::Subprocess, || {
            Err(TierFailure::MalformedOutput("garbage".into()))
        });
        let executor = TaskExecutor::with_tiers(vec![subprocess]);

        let err = executor
            .execute(TaskRequest::new(REPORT_GENERATION, records()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("report_generation"));
    }

    #[tokio::test]
    async fn test_default_chain_uses_native_bridge() {
        let executor = TaskExecutor::from_config(&ExecutorConfig::default());
        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, records()))
            .await
            .unwrap();
        assert_eq!(result.tier_used, TierKind::NativeBridge);

        let states: Vec<_> = executor.tier_status().iter().map(|s| s.state).collect();
        assert_eq!(states, vec!["ready", "unconfigured", "ready"]);
    }

    #[tokio::test]
    async fn test_disabled_bridge_without_binary_simulates() {
        let config = ExecutorConfig {
            native_bridge_enabled: false,
            ..Default::default()
        };
        let executor = TaskExecutor::from_config(&config);
        let result = executor
            .execute(TaskRequest::new(PATTERN_ANALYSIS, vec![]))
            .await
            .unwrap();

        assert_eq!(result.tier_used, TierKind::Simulation);
        assert_eq!(result.data["patterns"]["total_feedings"], json!(0));
    }
}
