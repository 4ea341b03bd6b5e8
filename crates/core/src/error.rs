//! Top-level error type aggregating every subsystem's local error enum.
//!
//! Each downstream crate defines its own `thiserror`-derived error type and
//! implements `From<ThatError> for crate::Error`, converting variant-by-variant
//! into one of the nested enums below. `error_code()` exposes the stable,
//! machine-readable string a `JobRun.error_code` column is populated with.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The aggregate error type. Every crate in the workspace ultimately reports
/// failures through this type via `?` at API boundaries.
#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("miner error: {0}")]
    Miner(#[from] MinerError),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("governor error: {0}")]
    Governor(#[from] GovernorError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// The stable error code surfaced on `Job`/`JobRun` rows (spec §7).
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Store(e) => e.error_code(),
            Error::Llm(e) => e.error_code(),
            Error::Schema(_) => "VALIDATION_FAILED",
            Error::Miner(e) => e.error_code(),
            Error::Evaluator(e) => e.error_code(),
            Error::Pipeline(e) => e.error_code(),
            Error::Orchestrator(e) => e.error_code(),
            Error::Config(_) => "INVALID_INPUT",
            Error::Governor(_) => "RESOURCE_EXHAUSTED",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("integrity violation: {0}")]
    Integrity(String),
    #[error("store busy, retry")]
    Busy,
    #[error("schema version {found} is newer than supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Integrity(_) => "INTEGRITY_ERROR",
            StoreError::Busy => "DATABASE_ERROR",
            StoreError::UnsupportedSchemaVersion { .. } => "DATABASE_ERROR",
            StoreError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("rate limited after retries")]
    RateLimited,
    #[error("cancelled")]
    Cancelled,
    #[error("resource exhausted")]
    ResourceExhausted,
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("response was not valid JSON: {0}")]
    ParseError(String),
}

impl LlmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::Provider(_) => "LLM_API_ERROR",
            LlmError::RateLimited => "RATE_LIMITED",
            LlmError::Cancelled => "CANCELLED",
            LlmError::ResourceExhausted => "RESOURCE_EXHAUSTED",
            LlmError::InvalidConfig(_) => "INVALID_INPUT",
            LlmError::Timeout(_) => "TIMEOUT",
            LlmError::ParseError(_) => "LLM_PARSE_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema '{schema}' validation failed: {errors:?}")]
    ValidationFailed { schema: String, errors: Vec<String> },
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
}

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
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

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
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

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("miner error: {0}")]
    Miner(#[from] MinerError),
    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
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

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("illegal status transition for job {job_id}: {from:?} -> {to:?}")]
    IllegalTransition { job_id: String, from: String, to: String },
}

impl OrchestratorError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Pipeline(e) => e.error_code(),
            OrchestratorError::Store(e) => e.error_code(),
            OrchestratorError::JobNotFound(_) => "NOT_FOUND",
            OrchestratorError::IllegalTransition { .. } => "INVALID_INPUT",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("missing required key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("memory usage sustained above deny threshold")]
    MemoryDenied,
}
