//! Provider enum and `provider:model` URI parsing (spec §4.3).

use std::fmt;
use std::str::FromStr;

use crate::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn default_concurrency(&self, local_lanes: usize) -> usize {
        match self {
            Provider::OpenAi | Provider::Anthropic => 16,
            Provider::Ollama => local_lanes.min(4).max(1),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            other => Err(LlmError::InvalidConfig(format!("unknown provider: {other}"))),
        }
    }
}

/// A fully resolved `provider:model` endpoint, e.g. `ollama:llama3.1:8b`.
/// The model name may itself contain colons, so only the first separator
/// is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ModelUri {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider_str, model) = s
            .split_once(':')
            .ok_or_else(|| LlmError::InvalidConfig(format!("not a provider:model URI: {s}")))?;
        if model.is_empty() {
            return Err(LlmError::InvalidConfig(format!("empty model in URI: {s}")));
        }
        Ok(ModelUri {
            provider: provider_str.parse()?,
            model: model.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_uri() {
        let uri: ModelUri = "openai:gpt-4o".parse().unwrap();
        assert_eq!(uri.provider, Provider::OpenAi);
        assert_eq!(uri.model, "gpt-4o");
    }

    #[test]
    fn model_name_may_contain_colon() {
        let uri: ModelUri = "ollama:llama3.1:8b".parse().unwrap();
        assert_eq!(uri.provider, Provider::Ollama);
        assert_eq!(uri.model, "llama3.1:8b");
    }

    #[test]
    fn unknown_provider_is_invalid_config() {
        let result: Result<ModelUri, _> = "cohere:command".parse();
        assert!(result.is_err());
    }

    #[test]
    fn missing_colon_is_invalid() {
        let result: Result<ModelUri, _> = "gpt-4o".parse();
        assert!(result.is_err());
    }
}
