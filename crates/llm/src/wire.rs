//! Provider-native wire formats. Each function builds the HTTP request for
//! one provider's chat/completion endpoint and parses its response into the
//! adapter's provider-agnostic shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{GenerateRequest, ResponseFormat, TokenUsage};
use crate::LlmError;

pub struct WireResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub raw: Value,
}

// ---- Ollama -----------------------------------------------------------

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

pub fn ollama_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

pub fn ollama_body(model: &str, req: &GenerateRequest) -> Value {
    let body = OllamaChatRequest {
        model,
        messages: vec![OllamaMessage {
            role: "user",
            content: &req.prompt,
        }],
        stream: false,
        options: OllamaOptions {
            temperature: req.temperature,
            num_predict: req.max_tokens,
        },
        format: matches!(req.response_format, ResponseFormat::Json).then_some("json"),
    };
    serde_json::to_value(body).expect("ollama request body always serializes")
}

pub fn parse_ollama_response(body: &str) -> Result<WireResponse, LlmError> {
    let parsed: OllamaChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let raw: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    Ok(WireResponse {
        text: parsed.message.content,
        usage: TokenUsage {
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
            total_tokens: parsed.prompt_eval_count + parsed.eval_count,
        },
        raw,
    })
}

// ---- OpenAI-compatible (also used for a handful of OpenAI-wire-compatible
//      self-hosted endpoints) -----------------------------------------

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

#[derive(Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

pub fn openai_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

pub fn openai_body(model: &str, req: &GenerateRequest) -> Value {
    let body = OpenAiChatRequest {
        model,
        messages: vec![OllamaMessage {
            role: "user",
            content: &req.prompt,
        }],
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        response_format: matches!(req.response_format, ResponseFormat::Json)
            .then_some(OpenAiResponseFormat { kind: "json_object" }),
    };
    serde_json::to_value(body).expect("openai request body always serializes")
}

pub fn parse_openai_response(body: &str) -> Result<WireResponse, LlmError> {
    let parsed: OpenAiChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let raw: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::Parse("no choices in response".to_string()))?;
    Ok(WireResponse {
        text,
        usage: TokenUsage {
            prompt_tokens: parsed.usage.prompt_tokens,
            completion_tokens: parsed.usage.completion_tokens,
            total_tokens: parsed.usage.total_tokens,
        },
        raw,
    })
}

// ---- Anthropic ----------------------------------------------------------

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OllamaMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

pub fn anthropic_url(base_url: &str) -> String {
    format!("{}/v1/messages", base_url.trim_end_matches('/'))
}

pub fn anthropic_body(model: &str, req: &GenerateRequest) -> Value {
    let body = AnthropicRequest {
        model,
        max_tokens: req.max_tokens.unwrap_or(4096),
        temperature: req.temperature,
        messages: vec![OllamaMessage {
            role: "user",
            content: &req.prompt,
        }],
    };
    serde_json::to_value(body).expect("anthropic request body always serializes")
}

pub fn parse_anthropic_response(body: &str) -> Result<WireResponse, LlmError> {
    let parsed: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let raw: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = parsed
        .content
        .into_iter()
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("");
    Ok(WireResponse {
        text,
        usage: TokenUsage {
            prompt_tokens: parsed.usage.input_tokens,
            completion_tokens: parsed.usage.output_tokens,
            total_tokens: parsed.usage.input_tokens + parsed.usage.output_tokens,
        },
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelUri;
    use std::str::FromStr;

    fn req(format: ResponseFormat) -> GenerateRequest {
        GenerateRequest::new(ModelUri::from_str("ollama:llama3.1:8b").unwrap(), "hello")
            .with_response_format(format)
    }

    #[test]
    fn ollama_body_sets_json_format_flag() {
        let body = ollama_body("llama3.1:8b", &req(ResponseFormat::Json));
        assert_eq!(body["format"], "json");
    }

    #[test]
    fn ollama_body_omits_format_for_text() {
        let body = ollama_body("llama3.1:8b", &req(ResponseFormat::Text));
        assert!(body.get("format").is_none());
    }

    #[test]
    fn parse_ollama_response_extracts_content_and_usage() {
        let raw = r#"{"message":{"content":"hi"},"prompt_eval_count":3,"eval_count":5}"#;
        let parsed = parse_ollama_response(raw).unwrap();
        assert_eq!(parsed.text, "hi");
        assert_eq!(parsed.usage.total_tokens, 8);
    }

    #[test]
    fn parse_openai_response_picks_first_choice() {
        let raw = r#"{"choices":[{"message":{"content":"hi"}}],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#;
        let parsed = parse_openai_response(raw).unwrap();
        assert_eq!(parsed.text, "hi");
        assert_eq!(parsed.usage.total_tokens, 3);
    }

    #[test]
    fn parse_anthropic_response_joins_blocks() {
        let raw = r#"{"content":[{"text":"a"},{"text":"b"}],"usage":{"input_tokens":1,"output_tokens":1}}"#;
        let parsed = parse_anthropic_response(raw).unwrap();
        assert_eq!(parsed.text, "ab");
    }
}
