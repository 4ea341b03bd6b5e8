//! LLM Adapter (spec component C3).

pub mod adapter;
pub mod audit;
pub mod provider;
pub mod semaphores;
pub mod types;
pub mod wire;

pub use adapter::{AdapterConfig, CancelToken, LlmAdapter};
pub use audit::{AuditRequest, AuditResponse, AuditSink, NoopAuditSink};
pub use provider::{ModelUri, Provider};
pub use types::{GenerateRequest, GenerationResult, ResponseFormat, TokenUsage};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("cancelled")]
    Cancelled,
    #[error("resource exhausted")]
    ResourceExhausted,
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

impl LlmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::Transport(_) | LlmError::Http { .. } => "LLM_API_ERROR",
            LlmError::RateLimited => "RATE_LIMITED",
            LlmError::Cancelled => "CANCELLED",
            LlmError::ResourceExhausted => "RESOURCE_EXHAUSTED",
            LlmError::InvalidConfig(_) => "INVALID_INPUT",
            LlmError::Timeout(_) => "TIMEOUT",
            LlmError::Parse(_) => "LLM_PARSE_ERROR",
        }
    }
}

/// Shared by every crate that nests an `LlmError` inside its own local error
/// type (`claw-miner`, `claw-evaluator`) so the variant-by-variant mapping
/// into the core error model is written once.
impl From<LlmError> for claw_core::error::LlmError {
    fn from(err: LlmError) -> Self {
        use claw_core::error::LlmError as CoreLlmError;

        match err {
            LlmError::Transport(msg) | LlmError::Http { body: msg, .. } => {
                CoreLlmError::Provider(msg)
            }
            LlmError::RateLimited => CoreLlmError::RateLimited,
            LlmError::Cancelled => CoreLlmError::Cancelled,
            LlmError::ResourceExhausted => CoreLlmError::ResourceExhausted,
            LlmError::InvalidConfig(msg) => CoreLlmError::InvalidConfig(msg),
            LlmError::Timeout(ms) => CoreLlmError::Timeout(ms),
            LlmError::Parse(msg) => CoreLlmError::ParseError(msg),
        }
    }
}

impl From<LlmError> for claw_core::Error {
    fn from(err: LlmError) -> Self {
        claw_core::Error::Llm(err.into())
    }
}
