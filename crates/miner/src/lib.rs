//! Unified Miner (spec component C4): single-call-per-segment candidate
//! extraction for claims, people, jargon, and concepts.

pub mod miner;
pub mod prompt;
pub mod types;

pub use miner::Miner;
pub use types::{ClaimCandidate, ConceptCandidate, JargonCandidate, MinerOutput, PersonCandidate};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("llm error: {0}")]
    Llm(#[from] claw_llm::LlmError),
    #[error("schema error: {0}")]
    Schema(#[from] claw_schema::SchemaError),
    #[error("validation failed after repair: {0}")]
    ValidationFailed(String),
}

impl MinerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            MinerError::Llm(e) => e.error_code(),
            MinerError::Schema(_) => "VALIDATION_FAILED",
            MinerError::ValidationFailed(_) => "VALIDATION_FAILED",
        }
    }
}

/// Shared by `claw-pipeline`, which nests a `MinerError` inside its own
/// local error type.
impl From<MinerError> for claw_core::error::MinerError {
    fn from(err: MinerError) -> Self {
        use claw_core::error::MinerError as CoreMinerError;

        match err {
            MinerError::Llm(e) => CoreMinerError::Llm(e.into()),
            MinerError::Schema(e) => CoreMinerError::Schema(e.into()),
            MinerError::ValidationFailed(msg) => CoreMinerError::ValidationFailed(msg),
        }
    }
}

impl From<MinerError> for claw_core::Error {
    fn from(err: MinerError) -> Self {
        claw_core::Error::Miner(err.into())
    }
}
