//! Process-wide settings: where the database lives, default LLM endpoints,
//! logging, and resource governor overrides. Loaded once at process start by
//! `claw-cli` and threaded explicitly into the components that need it.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "claw.db".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// `provider:model` URI used when a job config omits one.
    #[serde(default = "default_miner_model")]
    pub default_miner_model: String,
    #[serde(default = "default_flagship_model")]
    pub default_flagship_model: String,
    #[serde(default = "default_lightweight_model")]
    pub default_lightweight_model: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    #[serde(default = "default_cloud_concurrency")]
    pub cloud_concurrency: usize,
    #[serde(default = "default_request_timeout_s")]
    pub request_timeout_s: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_miner_model() -> String {
    "ollama:llama3.1:8b".to_string()
}
fn default_flagship_model() -> String {
    "openai:gpt-4o".to_string()
}
fn default_lightweight_model() -> String {
    "openai:gpt-4o-mini".to_string()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_cloud_concurrency() -> usize {
    16
}
fn default_request_timeout_s() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_miner_model: default_miner_model(),
            default_flagship_model: default_flagship_model(),
            default_lightweight_model: default_lightweight_model(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_base_url: default_ollama_base_url(),
            cloud_concurrency: default_cloud_concurrency(),
            request_timeout_s: default_request_timeout_s(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub observability: ObservabilitySettings,
    /// Hard override for the Resource Governor's worker-count derivation (§4.9).
    #[serde(default)]
    pub max_workers_override: Option<usize>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.cloud_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.cloud_concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.llm.request_timeout_s == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.request_timeout_s".to_string(),
                message: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings, layering (lowest to highest precedence):
/// `config/default.toml`, `config/{env}.toml`, then `CLAW__`-prefixed
/// environment variables (e.g. `CLAW__LLM__OPENAI_API_KEY`).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();
    builder = builder.add_source(File::with_name("config/default").required(false));
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("CLAW")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut s = Settings::default();
        s.llm.cloud_concurrency = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn load_settings_falls_back_to_defaults_when_no_files_present() {
        let settings = load_settings(None).expect("defaults alone must be loadable");
        assert_eq!(settings.store.db_path, "claw.db");
    }
}
