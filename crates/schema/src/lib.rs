//! Schema Validator (spec component C8): fixed JSON schemas for LLM outputs,
//! compiled once, plus deterministic repair-prompt construction.

pub mod schemas;
pub mod validator;

pub use validator::{build_repair_prompt, validate, SchemaError, SchemaName};
