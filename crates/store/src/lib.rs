//! Episode/Segment Store (spec component C2): embedded SQLite with WAL
//! journaling, foreign keys, and FTS5 full-text search over claims and
//! evidence quotes.

pub mod schema;
pub mod store;

pub use schema::CURRENT_SCHEMA_VERSION;
pub use store::{PipelineOutputs, Store};

use async_trait::async_trait;
use thiserror::Error;

use claw_llm::{AuditRequest, AuditResponse, AuditSink};

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

/// Shared by every crate that nests a `StoreError` inside its own local
/// error type (`claw-pipeline`, `claw-orchestrator`).
impl From<StoreError> for claw_core::error::StoreError {
    fn from(err: StoreError) -> Self {
        use claw_core::error::StoreError as CoreStoreError;

        match err {
            StoreError::NotFound(msg) => CoreStoreError::NotFound(msg),
            StoreError::Integrity(msg) => CoreStoreError::Integrity(msg),
            StoreError::Busy => CoreStoreError::Busy,
            StoreError::UnsupportedSchemaVersion { found, supported } => {
                CoreStoreError::UnsupportedSchemaVersion { found, supported }
            }
            StoreError::Database(msg) => CoreStoreError::Database(msg),
        }
    }
}

impl From<StoreError> for claw_core::Error {
    fn from(err: StoreError) -> Self {
        claw_core::Error::Store(err.into())
    }
}

/// Writes `claw-llm`'s per-call audit rows into `llm_requests`/`llm_responses`.
/// Lives here (rather than in `claw-llm`) so the LLM adapter has no
/// dependency on the store.
pub struct StoreAuditSink {
    store: std::sync::Arc<Store>,
}

impl StoreAuditSink {
    pub fn new(store: std::sync::Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn record_request(&self, request: AuditRequest) {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = store.writer_for_audit();
            conn.execute(
                "INSERT INTO llm_requests (request_id, job_run_id, provider, model, temperature, request_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    request.request_id,
                    request.job_run_id,
                    request.provider,
                    request.model,
                    request.temperature,
                    request.request_json.to_string(),
                ],
            )
        })
        .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to join audit write task");
        } else if let Ok(Err(err)) = result {
            tracing::warn!(error = %err, "failed to record llm request audit row");
        }
    }

    async fn record_response(&self, response: AuditResponse) {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = store.writer_for_audit();
            conn.execute(
                "INSERT INTO llm_responses (request_id, status_code, completion_tokens, prompt_tokens, total_tokens, latency_ms, response_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    response.request_id,
                    response.status_code,
                    response.completion_tokens,
                    response.prompt_tokens,
                    response.total_tokens,
                    response.latency_ms,
                    response.response_json.to_string(),
                ],
            )
        })
        .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to join audit write task");
        } else if let Ok(Err(err)) = result {
            tracing::warn!(error = %err, "failed to record llm response audit row");
        }
    }
}
