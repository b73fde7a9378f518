//! Native bridge tier: in-process analysis engine.
//!
//! # States
//! ```text
//! UNINITIALIZED → BRIDGE_READY        (loader succeeded)
//! UNINITIALIZED → BRIDGE_UNAVAILABLE  (loader failed or bridge disabled)
//! ```
//! Both outcomes are terminal for the lifetime of the tier. The first
//! caller runs the loader; concurrent first callers wait on the same
//! initialization instead of loading twice.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::executor::simulation::PatternSummary;
use crate::executor::tier::{PreparedTask, Tier, TierStatus};
use crate::executor::types::{
    TaskRequest, TaskResult, TierFailure, TierKind, PATTERN_ANALYSIS, REPORT_GENERATION,
};

/// An initialized in-process engine.
#[async_trait]
pub trait NativeBridge: Send + Sync {
    fn engine_name(&self) -> &str;

    async fn invoke(&self, task: &TaskRequest) -> Result<TaskResult, TierFailure>;
}

/// One-shot initializer for a [`NativeBridge`].
pub trait BridgeLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn NativeBridge>, TierFailure>;
}

/// Observable bridge state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Ready,
    Unavailable(String),
}

type BridgeSlot = Result<Arc<dyn NativeBridge>, String>;

pub struct NativeBridgeTier {
    enabled: bool,
    loader: Box<dyn BridgeLoader>,
    slot: OnceLock<BridgeSlot>,
}

impl NativeBridgeTier {
    pub fn new(enabled: bool, loader: Box<dyn BridgeLoader>) -> Self {
        Self {
            enabled,
            loader,
            slot: OnceLock::new(),
        }
    }

    /// Tier backed by the built-in analyzer engine.
    pub fn builtin(enabled: bool) -> Self {
        Self::new(enabled, Box::new(BuiltinLoader))
    }

    pub fn state(&self) -> BridgeState {
        match self.slot.get() {
            None => BridgeState::Uninitialized,
            Some(Ok(_)) => BridgeState::Ready,
            Some(Err(reason)) => BridgeState::Unavailable(reason.clone()),
        }
    }

    fn bridge(&self) -> Result<Arc<dyn NativeBridge>, TierFailure> {
        let slot = self.slot.get_or_init(|| {
            if !self.enabled {
                tracing::info!("Native bridge disabled by configuration");
                return Err("native bridge disabled".to_string());
            }
            match self.loader.load() {
                Ok(bridge) => {
                    tracing::info!(engine = %bridge.engine_name(), "Native bridge ready");
                    Ok(bridge)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Native bridge initialization failed; tier disabled");
                    Err(e.to_string())
                }
            }
        });

        match slot {
            Ok(bridge) => Ok(bridge.clone()),
            Err(reason) => Err(TierFailure::Unavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl Tier for NativeBridgeTier {
    fn kind(&self) -> TierKind {
        TierKind::NativeBridge
    }

    async fn run(&self, task: &PreparedTask) -> Result<TaskResult, TierFailure> {
        let bridge = self.bridge()?;
        bridge.invoke(&task.request).await
    }

    fn status(&self) -> TierStatus {
        let (state, detail) = match self.state() {
            BridgeState::Uninitialized => ("uninitialized", None),
            BridgeState::Ready => ("ready", None),
            BridgeState::Unavailable(reason) => ("unavailable", Some(reason)),
        };
        TierStatus {
            tier: TierKind::NativeBridge,
            state,
            detail,
        }
    }
}

struct BuiltinLoader;

impl BridgeLoader for BuiltinLoader {
    fn load(&self) -> Result<Arc<dyn NativeBridge>, TierFailure> {
        Ok(Arc::new(BuiltinAnalyzer))
    }
}

pub const BUILTIN_ENGINE: &str = "Native Bird Analyzer v1.0";

/// In-process analyzer. Extends the numeric summary with diversity and
/// per-location counts.
pub struct BuiltinAnalyzer;

impl BuiltinAnalyzer {
    fn analyze(&self, task: &TaskRequest) -> Map<String, Value> {
        let records = &task.payload;
        let summary = PatternSummary::compute(records);

        let mut birds: Vec<&str> = records.iter().map(|r| r.bird_type.as_str()).collect();
        birds.sort_unstable();
        birds.dedup();
        let mut foods: Vec<&str> = records.iter().map(|r| r.food_type.as_str()).collect();
        foods.sort_unstable();
        foods.dedup();

        let mut locations: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records.iter().filter(|r| !r.location.is_empty()) {
            *locations.entry(record.location.as_str()).or_default() += 1;
        }

        let mut patterns = summary.to_json();
        patterns.insert("bird_diversity".into(), json!(birds.len()));
        patterns.insert("food_variety".into(), json!(foods.len()));
        patterns.insert("feedings_by_location".into(), json!(locations));

        let mut recommendations = Vec::new();
        if !records.is_empty() && foods.len() < 3 {
            recommendations
                .push("Consider adding more food variety to attract different bird species".to_string());
        }
        if let Some(bird) = &summary.most_common_bird {
            if !bird.is_empty() {
                recommendations.push(format!("{bird} visits most often; keep its preferred food stocked"));
            }
        }

        let mut data = Map::new();
        data.insert("patterns".into(), Value::Object(patterns));
        data.insert("recommendations".into(), json!(recommendations));
        data.insert("analysis_engine".into(), json!(BUILTIN_ENGINE));
        data.insert("processed_by".into(), json!("Native Bridge"));
        data
    }
}

#[async_trait]
impl NativeBridge for BuiltinAnalyzer {
    fn engine_name(&self) -> &str {
        BUILTIN_ENGINE
    }

    async fn invoke(&self, task: &TaskRequest) -> Result<TaskResult, TierFailure> {
        match task.task_name.as_str() {
            PATTERN_ANALYSIS | REPORT_GENERATION => {
                Ok(TaskResult::succeeded(TierKind::NativeBridge, self.analyze(task)))
            }
            other => Ok(TaskResult::failed(
                TierKind::NativeBridge,
                format!("unsupported task '{other}'"),
            )),
        }
    }
}
