//! Request/response auditing (spec §4.3 "Auditing"). `claw-llm` has no
//! dependency on `claw-store`; callers inject a store-backed sink at
//! job-run construction time.

use async_trait::async_trait;
use serde_json::Value;

/// One row to be written before a call is attempted.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub request_id: String,
    pub job_run_id: String,
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub request_json: Value,
}

/// The paired row written after the call completes (successfully or not).
#[derive(Debug, Clone)]
pub struct AuditResponse {
    pub request_id: String,
    pub status_code: i64,
    pub completion_tokens: Option<i64>,
    pub prompt_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub latency_ms: i64,
    pub response_json: Value,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_request(&self, request: AuditRequest);
    async fn record_response(&self, response: AuditResponse);
}

/// Drops audit rows. Used in tests and for ad hoc CLI invocations that don't
/// have a job run to attribute calls to.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record_request(&self, _request: AuditRequest) {}
    async fn record_response(&self, _response: AuditResponse) {}
}
