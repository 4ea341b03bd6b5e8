//! LLM Adapter (spec component C3): the single abstracted `generate`
//! operation, owning per-provider concurrency, retries, memory backpressure,
//! timeouts, cancellation, and request/response auditing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::Client;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use claw_governor::{MemoryGate, ResourceGovernor};

use crate::audit::{AuditRequest, AuditResponse, AuditSink};
use crate::provider::Provider;
use crate::semaphores::semaphore_for;
use crate::types::{GenerateRequest, GenerationResult};
use crate::wire;
use crate::LlmError;

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub ollama_base_url: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub memory_wait_timeout_s: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            anthropic_api_key: None,
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            memory_wait_timeout_s: 30,
        }
    }
}

/// A job-scoped cooperative cancellation token (spec §5 "Cancellation
/// semantics"). Cheaply cloned; `cancel()` wakes every waiter immediately.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl CancelToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn sleep_or_cancel(&self, duration: Duration) -> Result<(), LlmError> {
        if self.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.notify.notified() => Err(LlmError::Cancelled),
        }
    }
}

pub struct LlmAdapter {
    http: Client,
    config: AdapterConfig,
    governor: Arc<ResourceGovernor>,
    audit: Arc<dyn AuditSink>,
}

impl LlmAdapter {
    pub fn new(config: AdapterConfig, governor: Arc<ResourceGovernor>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            http: Client::new(),
            config,
            governor,
            audit,
        }
    }

    fn is_retryable(err: &LlmError) -> bool {
        matches!(
            err,
            LlmError::Transport(_) | LlmError::Timeout(_) | LlmError::RateLimited
        )
    }

    /// Exponential backoff with full jitter, capped at `max_backoff_ms`.
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let exp = self.config.base_backoff_ms.saturating_mul(1u64 << attempt.min(16));
        let capped = exp.min(self.config.max_backoff_ms);
        let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
        Duration::from_millis(jittered)
    }

    async fn wait_for_capacity(&self, cancel: &CancelToken) -> Result<(), LlmError> {
        let wait = Duration::from_secs(self.config.memory_wait_timeout_s);
        if self.governor.wait_for_memory(wait).await == MemoryGate::Deny {
            return Err(LlmError::ResourceExhausted);
        }
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        Ok(())
    }

    fn execute_url(&self, provider: Provider) -> String {
        match provider {
            Provider::Ollama => wire::ollama_url(&self.config.ollama_base_url),
            Provider::OpenAi => wire::openai_url(&self.config.openai_base_url),
            Provider::Anthropic => wire::anthropic_url(&self.config.anthropic_base_url),
        }
    }

    fn apply_auth(&self, provider: Provider, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, LlmError> {
        match provider {
            Provider::Ollama => Ok(builder),
            Provider::OpenAi => {
                let key = self
                    .config
                    .openai_api_key
                    .as_ref()
                    .ok_or_else(|| LlmError::InvalidConfig("missing openai_api_key".to_string()))?;
                Ok(builder.bearer_auth(key))
            }
            Provider::Anthropic => {
                let key = self.config.anthropic_api_key.as_ref().ok_or_else(|| {
                    LlmError::InvalidConfig("missing anthropic_api_key".to_string())
                })?;
                Ok(builder
                    .header("x-api-key", key)
                    .header("anthropic-version", "2023-06-01"))
            }
        }
    }

    /// Single HTTP attempt; does not retry. Used by `generate`'s retry loop.
    async fn execute_once(&self, request: &GenerateRequest) -> Result<wire::WireResponse, LlmError> {
        let provider = request.endpoint.provider;
        let model = request.endpoint.model.as_str();
        let body = match provider {
            Provider::Ollama => wire::ollama_body(model, request),
            Provider::OpenAi => wire::openai_body(model, request),
            Provider::Anthropic => wire::anthropic_body(model, request),
        };

        let builder = self.http.post(self.execute_url(provider)).json(&body);
        let builder = self.apply_auth(provider, builder)?;
        let builder = builder.timeout(Duration::from_secs(request.request_timeout_s));

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(request.request_timeout_s * 1000)
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        match provider {
            Provider::Ollama => wire::parse_ollama_response(&text),
            Provider::OpenAi => wire::parse_openai_response(&text),
            Provider::Anthropic => wire::parse_anthropic_response(&text),
        }
    }

    /// The abstracted `generate` operation (spec §4.3).
    #[instrument(skip(self, request, cancel), fields(provider = %request.endpoint.provider, model = %request.endpoint.model))]
    pub async fn generate(
        &self,
        job_run_id: &str,
        request: GenerateRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResult, LlmError> {
        let provider = request.endpoint.provider;
        let local_lanes = self.governor.physical_cores().min(4);
        let permits = provider.default_concurrency(local_lanes);
        let semaphore = semaphore_for(provider, permits);

        self.wait_for_capacity(cancel).await?;

        let _permit = tokio::select! {
            permit = semaphore.acquire() => permit.expect("semaphore is never closed"),
            _ = async {
                loop {
                    if cancel.is_cancelled() { break; }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            } => return Err(LlmError::Cancelled),
        };

        let mut last_err = LlmError::Transport("no attempts made".to_string());
        for attempt in 0..=self.config.max_retries {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            let request_id = uuid::Uuid::new_v4().to_string();
            self.audit
                .record_request(AuditRequest {
                    request_id: request_id.clone(),
                    job_run_id: job_run_id.to_string(),
                    provider: provider.to_string(),
                    model: request.endpoint.model.clone(),
                    temperature: request.temperature,
                    request_json: serde_json::json!({ "prompt": request.prompt }),
                })
                .await;

            let started = Instant::now();
            let outcome = self.execute_once(&request).await;
            let latency_ms = started.elapsed().as_millis() as i64;

            match outcome {
                Ok(wire_response) => {
                    self.audit
                        .record_response(AuditResponse {
                            request_id,
                            status_code: 200,
                            completion_tokens: Some(wire_response.usage.completion_tokens as i64),
                            prompt_tokens: Some(wire_response.usage.prompt_tokens as i64),
                            total_tokens: Some(wire_response.usage.total_tokens as i64),
                            latency_ms,
                            response_json: wire_response.raw.clone(),
                        })
                        .await;
                    return Ok(GenerationResult {
                        text: wire_response.text,
                        usage: wire_response.usage,
                        latency_ms: latency_ms as u64,
                        attempts: attempt + 1,
                    });
                }
                Err(err) => {
                    let status_code = match &err {
                        LlmError::Http { status, .. } => *status as i64,
                        LlmError::RateLimited => 429,
                        _ => 0,
                    };
                    self.audit
                        .record_response(AuditResponse {
                            request_id,
                            status_code,
                            completion_tokens: None,
                            prompt_tokens: None,
                            total_tokens: None,
                            latency_ms,
                            response_json: serde_json::json!({ "error": err.to_string() }),
                        })
                        .await;

                    if !Self::is_retryable(&err) || attempt == self.config.max_retries {
                        last_err = err;
                        break;
                    }
                    debug!(attempt, error = %err, "llm call failed, retrying");
                    last_err = err;
                    let backoff = self.backoff_duration(attempt);
                    cancel.sleep_or_cancel(backoff).await?;
                }
            }
        }

        warn!(error = %last_err, "llm call exhausted retries");
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap() {
        let adapter_config = AdapterConfig {
            base_backoff_ms: 1000,
            max_backoff_ms: 5000,
            ..Default::default()
        };
        let governor = Arc::new(ResourceGovernor::detect(None, Some(1)));
        let adapter = LlmAdapter::new(adapter_config, governor, Arc::new(crate::audit::NoopAuditSink));
        for attempt in 0..10 {
            assert!(adapter.backoff_duration(attempt).as_millis() as u64 <= 5000);
        }
    }

    #[test]
    fn cancel_token_reports_cancelled() {
        let token = CancelToken::default();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
