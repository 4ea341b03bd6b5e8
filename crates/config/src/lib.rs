//! Settings and per-job configuration for the claim-extraction pipeline.
//!
//! Supports loading configuration from TOML files plus `CLAW__`-prefixed
//! environment variable overrides.

pub mod job;
pub mod settings;

pub use job::{JobConfig, RoutingPolicy, Stage, UncertaintyBand};
pub use settings::{load_settings, LlmSettings, ObservabilitySettings, RuntimeEnvironment, Settings, StoreSettings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for claw_core::Error {
    fn from(err: ConfigError) -> Self {
        claw_core::Error::Config(claw_core::error::ConfigError::Load(err.to_string()))
    }
}
