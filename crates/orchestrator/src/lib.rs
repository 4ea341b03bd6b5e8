//! Orchestrator (spec component C7): job lifecycle state machine, stage
//! chaining for `pipeline` jobs, checkpoint resume, and metrics aggregation.

pub mod orchestrator;
pub mod registry;

pub use orchestrator::Orchestrator;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] claw_pipeline::PipelineError),
    #[error("store error: {0}")]
    Store(#[from] claw_store::StoreError),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("illegal status transition for job {job_id}: {from} -> {to}")]
    IllegalTransition { job_id: String, from: String, to: String },
}

impl OrchestratorError {
    /// The stable error code written to `JobRun.error_code` (spec §7).
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Pipeline(e) => e.error_code(),
            OrchestratorError::Store(e) => e.error_code(),
            OrchestratorError::JobNotFound(_) => "NOT_FOUND",
            OrchestratorError::IllegalTransition { .. } => "INVALID_INPUT",
        }
    }
}

impl From<OrchestratorError> for claw_core::error::OrchestratorError {
    fn from(err: OrchestratorError) -> Self {
        use claw_core::error::OrchestratorError as CoreOrchestratorError;

        match err {
            OrchestratorError::Pipeline(e) => CoreOrchestratorError::Pipeline(e.into()),
            OrchestratorError::Store(e) => CoreOrchestratorError::Store(e.into()),
            OrchestratorError::JobNotFound(id) => CoreOrchestratorError::JobNotFound(id),
            OrchestratorError::IllegalTransition { job_id, from, to } => {
                CoreOrchestratorError::IllegalTransition { job_id, from, to }
            }
        }
    }
}

impl From<OrchestratorError> for claw_core::Error {
    fn from(err: OrchestratorError) -> Self {
        claw_core::Error::Orchestrator(err.into())
    }
}
