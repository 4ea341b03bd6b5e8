//! Evaluator/Router (spec component C5): tiers raw candidates from the
//! Unified Miner and routes them between lightweight and flagship models.

pub mod evaluator;
pub mod prompt;
pub mod rubric;
pub mod types;

pub use evaluator::{Evaluator, EvaluatorContext};
pub use types::{Outcome, PendingCandidate, RawTier, Verdict};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("llm error: {0}")]
    Llm(#[from] claw_llm::LlmError),
    #[error("all evaluator calls failed: {0}")]
    Unreachable(String),
}

impl EvaluatorError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EvaluatorError::Llm(e) => e.error_code(),
            EvaluatorError::Unreachable(_) => "EVALUATION_FAILED",
        }
    }
}

/// Shared by `claw-pipeline`, which nests an `EvaluatorError` inside its own
/// local error type.
impl From<EvaluatorError> for claw_core::error::EvaluatorError {
    fn from(err: EvaluatorError) -> Self {
        use claw_core::error::EvaluatorError as CoreEvaluatorError;

        match err {
            EvaluatorError::Llm(e) => CoreEvaluatorError::Llm(e.into()),
            EvaluatorError::Unreachable(msg) => CoreEvaluatorError::Unreachable(msg),
        }
    }
}

impl From<EvaluatorError> for claw_core::Error {
    fn from(err: EvaluatorError) -> Self {
        claw_core::Error::Evaluator(err.into())
    }
}
