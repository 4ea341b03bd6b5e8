//! Pipeline Driver (spec component C6): worker-pool scheduling of the
//! Unified Miner across an episode's segments, checkpointing, aggregation,
//! and the >50%-segment-failure abort rule.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use claw_core::model::Segment;
use claw_governor::ResourceGovernor;
use claw_llm::{CancelToken, ModelUri};
use claw_miner::{Miner, MinerOutput};

use crate::aggregate::{aggregate, AggregatedCandidates, SegmentOutput};
use crate::PipelineError;

/// Emitted after every `checkpoint_every` completed segments (spec §4.6
/// "Checkpointing"). The caller (Orchestrator) persists this as the
/// JobRun's `checkpoint_json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MiningCheckpoint {
    pub last_completed_index: usize,
    pub claims_so_far: usize,
    pub people_so_far: usize,
    pub jargon_so_far: usize,
    pub concepts_so_far: usize,
    /// Segment ids whose mining output has been durably aggregated so far;
    /// a resumed run skips exactly these, regardless of completion order.
    pub done_segment_ids: Vec<String>,
}

pub struct MiningStageConfig {
    pub episode_title: String,
    pub model: ModelUri,
    pub temperature: f64,
    pub request_timeout_s: u64,
    pub checkpoint_every: usize,
}

/// Drives the mining stage for one episode: segments `segments` that are not
/// already in `already_done` (resume support) across a worker pool sized by
/// the Resource Governor, emitting a checkpoint via `on_checkpoint` every
/// `checkpoint_every` completions.
pub async fn run_mining_stage(
    job_run_id: &str,
    miner: Arc<Miner>,
    governor: Arc<ResourceGovernor>,
    segments: Vec<Segment>,
    already_done: &HashSet<String>,
    config: MiningStageConfig,
    cancel: CancelToken,
    on_checkpoint: impl Fn(MiningCheckpoint) + Send + Sync + 'static,
) -> Result<AggregatedCandidates, PipelineError> {
    let pending: Vec<(usize, Segment)> = segments
        .into_iter()
        .enumerate()
        .filter(|(_, seg)| !already_done.contains(&seg.segment_id))
        .collect();

    let total = pending.len();
    if total == 0 {
        return Ok(AggregatedCandidates::default());
    }

    let worker_count = governor.worker_count();
    let semaphore = Arc::new(Semaphore::new(worker_count));
    let completed = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let on_checkpoint = Arc::new(on_checkpoint);

    let mut join_set: JoinSet<(usize, String, MinerOutput, bool)> = JoinSet::new();

    for (segment_order, segment) in pending {
        if cancel.is_cancelled() {
            break;
        }
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
        let miner = miner.clone();
        let job_run_id = job_run_id.to_string();
        let episode_title = config.episode_title.clone();
        let model = config.model.clone();
        let temperature = config.temperature;
        let request_timeout_s = config.request_timeout_s;
        let cancel = cancel.clone();

        join_set.spawn(async move {
            let _permit = permit;
            let segment_id = segment.segment_id.clone();
            match miner
                .mine_segment(&job_run_id, &episode_title, &segment, &model, temperature, request_timeout_s, &cancel)
                .await
            {
                Ok(output) => (segment_order, segment_id, output, true),
                Err(err) => {
                    warn!(segment_id = %segment_id, error = %err, "segment mining failed");
                    (segment_order, segment_id, MinerOutput::default(), false)
                }
            }
        });
    }

    let mut outputs = Vec::with_capacity(total);
    let checkpoint_every = config.checkpoint_every.max(1);

    while let Some(joined) = join_set.join_next().await {
        if cancel.is_cancelled() {
            join_set.abort_all();
            warn!("mining stage cancelled, abandoning in-flight segments");
            break;
        }

        let (segment_order, segment_id, output, ok) = joined.map_err(|e| {
            PipelineError::Miner(claw_miner::MinerError::ValidationFailed(e.to_string()))
        })?;
        if !ok {
            failed.fetch_add(1, Ordering::SeqCst);
        }

        let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
        outputs.push(SegmentOutput { segment_id, segment_order, output });

        if n % checkpoint_every == 0 {
            let aggregated_so_far = partial_counts(&outputs);
            on_checkpoint(MiningCheckpoint {
                last_completed_index: n,
                claims_so_far: aggregated_so_far.0,
                people_so_far: aggregated_so_far.1,
                jargon_so_far: aggregated_so_far.2,
                concepts_so_far: aggregated_so_far.3,
                done_segment_ids: outputs.iter().map(|o| o.segment_id.clone()).collect(),
            });
        }
    }

    let failed_count = failed.load(Ordering::SeqCst);
    if total > 0 && failed_count as f64 / total as f64 > 0.5 {
        return Err(PipelineError::ProcessingFailed);
    }

    info!(total, failed = failed_count, "mining stage complete");
    outputs.sort_by_key(|o| o.segment_order);
    Ok(aggregate(outputs))
}

fn partial_counts(outputs: &[SegmentOutput]) -> (usize, usize, usize, usize) {
    outputs.iter().fold((0, 0, 0, 0), |acc, o| {
        (
            acc.0 + o.output.claims.len(),
            acc.1 + o.output.people.len(),
            acc.2 + o.output.jargon.len(),
            acc.3 + o.output.concepts.len(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_counts_sums_across_segments() {
        let outputs = vec![SegmentOutput {
            segment_id: "seg-0".to_string(),
            segment_order: 0,
            output: MinerOutput {
                claims: vec![claw_miner::ClaimCandidate {
                    raw_text: "a".to_string(),
                    canonical_text: "a".to_string(),
                    char_start: 0,
                    char_end: 1,
                }],
                ..Default::default()
            },
        }];
        assert_eq!(partial_counts(&outputs), (1, 0, 0, 0));
    }
}
