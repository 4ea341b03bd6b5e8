//! Request/response types for the abstracted `generate` operation.

use serde::{Deserialize, Serialize};

use crate::provider::ModelUri;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub endpoint: ModelUri,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
    pub request_timeout_s: u64,
}

impl GenerateRequest {
    pub fn new(endpoint: ModelUri, prompt: impl Into<String>) -> Self {
        Self {
            endpoint,
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: None,
            response_format: ResponseFormat::Text,
            request_timeout_s: 120,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_timeout_s(mut self, timeout_s: u64) -> Self {
        self.request_timeout_s = timeout_s;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub attempts: u32,
}
