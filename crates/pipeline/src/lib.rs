//! Pipeline Driver (spec component C6): segmentation, worker-pool
//! scheduling of the Unified Miner, checkpointing, and aggregation for one
//! episode's mining stage.

pub mod aggregate;
pub mod driver;
pub mod run;
pub mod segmentation;

pub use aggregate::{aggregate, AggregatedCandidates, SegmentOutput};
pub use driver::{run_mining_stage, MiningCheckpoint, MiningStageConfig};
pub use run::{run_episode_pipeline, EpisodePipelineConfig};
pub use segmentation::resolve_segments;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] claw_store::StoreError),
    #[error("miner error: {0}")]
    Miner(#[from] claw_miner::MinerError),
    #[error("evaluator error: {0}")]
    Evaluator(#[from] claw_evaluator::EvaluatorError),
    #[error("more than half of segments failed")]
    ProcessingFailed,
    #[error("cancelled")]
    Cancelled,
    #[error("resource exhausted")]
    ResourceExhausted,
}

impl PipelineError {
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Store(e) => e.error_code(),
            PipelineError::Miner(e) => e.error_code(),
            PipelineError::Evaluator(e) => e.error_code(),
            PipelineError::ProcessingFailed => "PROCESSING_FAILED",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::ResourceExhausted => "RESOURCE_EXHAUSTED",
        }
    }
}

impl From<PipelineError> for claw_core::Error {
    fn from(err: PipelineError) -> Self {
        use claw_core::error::PipelineError as CorePipelineError;

        let core_err = match err {
            PipelineError::Store(e) => CorePipelineError::Store(e.into()),
            PipelineError::Miner(e) => CorePipelineError::Miner(e.into()),
            PipelineError::Evaluator(e) => CorePipelineError::Evaluator(e.into()),
            PipelineError::ProcessingFailed => CorePipelineError::ProcessingFailed,
            PipelineError::Cancelled => CorePipelineError::Cancelled,
            PipelineError::ResourceExhausted => CorePipelineError::ResourceExhausted,
        };

        claw_core::Error::Pipeline(core_err)
    }
}
