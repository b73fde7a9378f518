//! Simulation tier: deterministic local summary.
//!
//! This is the base case of the fallback chain. It spawns nothing, reads
//! nothing from disk, and cannot fail for a decoded payload.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::executor::tier::{PreparedTask, Tier, TierStatus};
use crate::executor::types::{FeedingRecord, TaskResult, TierFailure, TierKind};

pub const SIMULATION_ENGINE: &str = "Local Pattern Simulator v1.0";

/// Most frequent value; ties go to the value seen first in input order.
pub fn most_frequent<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    let mut order: Vec<&'a str> = Vec::new();

    for value in values {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut best: Option<(&'a str, usize)> = None;
    for value in order {
        let count = counts[&value];
        // Strictly greater keeps the earliest value on ties.
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

/// Numeric summary over a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSummary {
    pub most_common_bird: Option<String>,
    pub preferred_food: Option<String>,
    pub average_quantity: f64,
    pub total_feedings: usize,
}

impl PatternSummary {
    pub fn compute(records: &[FeedingRecord]) -> Self {
        let total_feedings = records.len();
        let average_quantity = if total_feedings == 0 {
            0.0
        } else {
            let sum: i128 = records.iter().map(|r| i128::from(r.quantity)).sum();
            sum as f64 / total_feedings as f64
        };

        Self {
            most_common_bird: most_frequent(records.iter().map(|r| r.bird_type.as_str()))
                .map(str::to_string),
            preferred_food: most_frequent(records.iter().map(|r| r.food_type.as_str()))
                .map(str::to_string),
            average_quantity,
            total_feedings,
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut patterns = Map::new();
        patterns.insert("most_common_bird".into(), json!(self.most_common_bird));
        patterns.insert("preferred_food".into(), json!(self.preferred_food));
        patterns.insert("average_quantity".into(), json!(self.average_quantity));
        patterns.insert("total_feedings".into(), json!(self.total_feedings));
        patterns
    }
}

/// Terminal tier of the chain.
#[derive(Debug, Default)]
pub struct SimulationTier;

impl SimulationTier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tier for SimulationTier {
    fn kind(&self) -> TierKind {
        TierKind::Simulation
    }

    async fn run(&self, task: &PreparedTask) -> Result<TaskResult, TierFailure> {
        let summary = PatternSummary::compute(&task.request.payload);

        let mut data = Map::new();
        data.insert("patterns".into(), Value::Object(summary.to_json()));
        data.insert("analysis_engine".into(), json!(SIMULATION_ENGINE));
        data.insert("processed_by".into(), json!("Simulation"));

        Ok(TaskResult::succeeded(TierKind::Simulation, data))
    }

    fn status(&self) -> TierStatus {
        TierStatus {
            tier: TierKind::Simulation,
            state: "ready",
            detail: None,
        }
    }
}
