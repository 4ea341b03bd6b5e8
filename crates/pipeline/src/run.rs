//! Chains the mining stage and the Evaluator/Router into one pipeline pass
//! for a single episode: segmentation, worker-pool mining, cross-segment
//! dedup, routing/tiering, and an atomic store upsert.

use std::collections::HashSet;
use std::sync::Arc;

use claw_config::JobConfig;
use claw_core::model::EpisodeBundle;
use claw_evaluator::{Evaluator, EvaluatorContext};
use claw_governor::ResourceGovernor;
use claw_llm::CancelToken;
use claw_miner::Miner;
use claw_store::{PipelineOutputs, Store};

use crate::driver::{run_mining_stage, MiningCheckpoint, MiningStageConfig};
use crate::segmentation::resolve_segments;
use crate::PipelineError;

/// Configuration for one end-to-end pipeline pass over an episode (spec
/// component C6 driving C4/C5 and persisting through C2).
pub struct EpisodePipelineConfig {
    pub mining: MiningStageConfig,
    pub evaluator: EvaluatorContext,
    pub job_config: JobConfig,
}

/// Runs mining, aggregation, and evaluation for `bundle`, then atomically
/// replaces `bundle.source_id`'s (really the episode's) prior pipeline
/// output in `store`. `already_done` names segment ids whose mining output
/// a resumed job run already has (spec §4.6 "Resume").
pub async fn run_episode_pipeline(
    store: Arc<Store>,
    miner: Arc<Miner>,
    evaluator: Arc<Evaluator>,
    governor: Arc<ResourceGovernor>,
    job_run_id: &str,
    episode_id: &str,
    bundle: &EpisodeBundle,
    already_done: &HashSet<String>,
    config: EpisodePipelineConfig,
    cancel: CancelToken,
    on_checkpoint: impl Fn(MiningCheckpoint) + Send + Sync + 'static,
) -> Result<PipelineOutputs, PipelineError> {
    let segments = resolve_segments(bundle);

    let aggregated = run_mining_stage(
        job_run_id,
        miner,
        governor,
        segments,
        already_done,
        config.mining,
        cancel.clone(),
        on_checkpoint,
    )
    .await?;

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let claims = evaluator
        .evaluate_claims(
            &config.evaluator,
            episode_id,
            config.job_config.routing_for("claims"),
            aggregated.claims,
            &cancel,
        )
        .await?;
    let people = evaluator
        .evaluate_people(
            &config.evaluator,
            episode_id,
            config.job_config.routing_for("people"),
            aggregated.people,
            &cancel,
        )
        .await?;
    let concepts = evaluator
        .evaluate_concepts(
            &config.evaluator,
            episode_id,
            config.job_config.routing_for("concepts"),
            aggregated.concepts,
            &cancel,
        )
        .await?;
    let jargon = evaluator
        .evaluate_jargon(
            &config.evaluator,
            episode_id,
            config.job_config.routing_for("jargon"),
            aggregated.jargon,
            &cancel,
        )
        .await?;

    let outputs = PipelineOutputs { claims, people, concepts, jargon };
    store.upsert_pipeline_outputs(episode_id, &outputs)?;

    Ok(outputs)
}
