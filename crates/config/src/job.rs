//! Per-job configuration (spec §6 "Job config"), the JSON object stored
//! verbatim as `Job.config_json` and interpreted by the orchestrator and
//! pipeline driver.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcribe,
    Mine,
    Flagship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    Flagship,
    Lightweight,
    Dual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    pub low: f64,
    pub high: f64,
}

impl Default for UncertaintyBand {
    fn default() -> Self {
        Self { low: 0.4, high: 0.6 }
    }
}

impl UncertaintyBand {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.low && score <= self.high
    }
}

fn default_stages() -> Vec<Stage> {
    vec![Stage::Mine, Stage::Flagship]
}

fn default_routing_policy() -> HashMap<String, RoutingPolicy> {
    let mut m = HashMap::new();
    m.insert("claims".to_string(), RoutingPolicy::Dual);
    m.insert("people".to_string(), RoutingPolicy::Lightweight);
    m.insert("concepts".to_string(), RoutingPolicy::Dual);
    m.insert("jargon".to_string(), RoutingPolicy::Lightweight);
    m
}

fn default_checkpoint_every() -> u32 {
    5
}

fn default_temperature() -> f64 {
    0.0
}

fn default_request_timeout_s() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    10
}

/// Recognized options for a Job's `config_json` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,

    pub miner_model: Option<String>,
    pub flagship_model: Option<String>,
    pub lightweight_model: Option<String>,

    #[serde(default = "default_routing_policy")]
    pub routing_policy: HashMap<String, RoutingPolicy>,

    pub max_workers: Option<usize>,

    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_request_timeout_s")]
    pub request_timeout_s: u64,

    #[serde(default)]
    pub uncertainty_band: UncertaintyBand,

    #[serde(default = "default_batch_size")]
    pub evaluator_batch_size: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            miner_model: None,
            flagship_model: None,
            lightweight_model: None,
            routing_policy: default_routing_policy(),
            max_workers: None,
            checkpoint_every: default_checkpoint_every(),
            temperature: default_temperature(),
            request_timeout_s: default_request_timeout_s(),
            uncertainty_band: UncertaintyBand::default(),
            evaluator_batch_size: default_batch_size(),
        }
    }
}

impl JobConfig {
    pub fn routing_for(&self, entity_kind: &str) -> RoutingPolicy {
        self.routing_policy
            .get(entity_kind)
            .copied()
            .unwrap_or(RoutingPolicy::Lightweight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_job_config_round_trips_through_json() {
        let cfg = JobConfig::default();
        let json = serde_json::to_value(&cfg).unwrap();
        let back: JobConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.checkpoint_every, 5);
        assert_eq!(back.stages, vec![Stage::Mine, Stage::Flagship]);
    }

    #[test]
    fn unknown_entity_kind_falls_back_to_lightweight() {
        let cfg = JobConfig::default();
        assert_eq!(cfg.routing_for("unknown_kind"), RoutingPolicy::Lightweight);
    }

    #[test]
    fn uncertainty_band_contains_is_inclusive() {
        let band = UncertaintyBand::default();
        assert!(band.contains(0.4));
        assert!(band.contains(0.6));
        assert!(!band.contains(0.39));
    }
}
