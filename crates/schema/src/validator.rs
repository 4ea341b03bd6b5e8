//! Compiles the fixed schemas once per process and validates LLM output
//! against them, producing deterministic repair prompts on failure.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::schemas::{evaluator_batch_schema, miner_output_schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaName {
    MinerOutput,
    EvaluatorBatch,
}

impl SchemaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::MinerOutput => "miner_output",
            SchemaName::EvaluatorBatch => "evaluator_batch",
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

/// Shared by every crate that nests a `SchemaError` inside its own local
/// error type (`claw-miner`, `claw-evaluator`).
impl From<SchemaError> for claw_core::error::SchemaError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::ValidationFailed { schema, errors } => {
                claw_core::error::SchemaError::ValidationFailed { schema, errors }
            }
            SchemaError::UnknownSchema(s) => claw_core::error::SchemaError::UnknownSchema(s),
        }
    }
}

impl From<SchemaError> for claw_core::Error {
    fn from(err: SchemaError) -> Self {
        claw_core::Error::Schema(err.into())
    }
}

/// Leaks the schema document to obtain the `'static` borrow `JSONSchema`
/// requires; schemas are compiled exactly once and live for the process.
fn compile(schema_doc: serde_json::Value) -> JSONSchema {
    let leaked: &'static serde_json::Value = Box::leak(Box::new(schema_doc));
    JSONSchema::compile(leaked).expect("built-in schema document must be valid JSON Schema")
}

static MINER_OUTPUT: Lazy<JSONSchema> = Lazy::new(|| compile(miner_output_schema()));
static EVALUATOR_BATCH: Lazy<JSONSchema> = Lazy::new(|| compile(evaluator_batch_schema()));

fn compiled(name: SchemaName) -> &'static JSONSchema {
    match name {
        SchemaName::MinerOutput => &MINER_OUTPUT,
        SchemaName::EvaluatorBatch => &EVALUATOR_BATCH,
    }
}

/// Validates `obj` against the named schema, returning the list of
/// human-readable validation errors (empty iff valid).
pub fn validate(name: SchemaName, obj: &serde_json::Value) -> Result<(), SchemaError> {
    let schema = compiled(name);
    let result = schema.validate(obj);
    match result {
        Ok(()) => Ok(()),
        Err(errors) => {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            Err(SchemaError::ValidationFailed {
                schema: name.as_str().to_string(),
                errors: messages,
            })
        }
    }
}

/// Builds a deterministic repair prompt naming the schema and the failing
/// fields, demanding a corrected object with no surrounding prose. Used for
/// the single repair attempt each of the miner and evaluator make (spec §4.4,
/// §4.8).
pub fn build_repair_prompt(
    name: SchemaName,
    invalid_output: &str,
    errors: &[String],
) -> String {
    let field_list = if errors.is_empty() {
        "the object failed schema validation".to_string()
    } else {
        errors.join("; ")
    };
    format!(
        "Your previous response did not conform to the required '{schema}' JSON schema.\n\
         Validation errors: {field_list}\n\n\
         Previous response:\n{invalid}\n\n\
         Return ONLY a corrected JSON object conforming to the schema. \
         Do not include any explanation, markdown fences, or extra text.",
        schema = name.as_str(),
        field_list = field_list,
        invalid = invalid_output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_miner_output_passes() {
        let obj = json!({
            "claims": [{"raw_text": "a", "canonical_text": "a", "char_start": 0, "char_end": 1}],
            "people": [],
            "jargon": [],
            "concepts": []
        });
        assert!(validate(SchemaName::MinerOutput, &obj).is_ok());
    }

    #[test]
    fn missing_key_fails_miner_output() {
        let obj = json!({ "claims": [] });
        let err = validate(SchemaName::MinerOutput, &obj).unwrap_err();
        match err {
            SchemaError::ValidationFailed { errors, .. } => assert!(!errors.is_empty()),
            _ => panic!("expected ValidationFailed"),
        }
    }

    #[test]
    fn valid_evaluator_batch_passes() {
        let obj = json!({
            "results": [{
                "ref": 0, "score": 0.9, "tier": "A", "uncertain": false,
                "rationale": "clear", "evidence": [{"char_start": 0, "char_end": 5}]
            }]
        });
        assert!(validate(SchemaName::EvaluatorBatch, &obj).is_ok());
    }

    #[test]
    fn out_of_range_score_fails() {
        let obj = json!({
            "results": [{
                "ref": 0, "score": 1.5, "tier": "A", "uncertain": false,
                "rationale": "x", "evidence": []
            }]
        });
        assert!(validate(SchemaName::EvaluatorBatch, &obj).is_err());
    }

    #[test]
    fn repair_prompt_names_schema_and_errors() {
        let prompt = build_repair_prompt(
            SchemaName::MinerOutput,
            "{not json",
            &["missing field 'claims'".to_string()],
        );
        assert!(prompt.contains("miner_output"));
        assert!(prompt.contains("missing field 'claims'"));
    }
}
