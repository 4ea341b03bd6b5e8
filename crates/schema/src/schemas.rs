//! The fixed JSON Schema documents LLM outputs are validated against (spec §6).
//! Expressed as `serde_json::Value` (draft 2020-12 subset), compiled once.

use serde_json::json;

pub fn miner_output_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["claims", "people", "jargon", "concepts"],
        "properties": {
            "claims": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["raw_text", "canonical_text", "char_start", "char_end"],
                    "properties": {
                        "raw_text": { "type": "string" },
                        "canonical_text": { "type": "string" },
                        "char_start": { "type": "integer", "minimum": 0 },
                        "char_end": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "people": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["display_name", "char_start", "char_end"],
                    "properties": {
                        "display_name": { "type": "string" },
                        "role": { "type": ["string", "null"] },
                        "char_start": { "type": "integer", "minimum": 0 },
                        "char_end": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "jargon": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["term", "definition", "char_start", "char_end"],
                    "properties": {
                        "term": { "type": "string" },
                        "definition": { "type": "string" },
                        "char_start": { "type": "integer", "minimum": 0 },
                        "char_end": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "concepts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "definition", "char_start", "char_end"],
                    "properties": {
                        "name": { "type": "string" },
                        "definition": { "type": "string" },
                        "char_start": { "type": "integer", "minimum": 0 },
                        "char_end": { "type": "integer", "minimum": 0 }
                    }
                }
            }
        }
    })
}

/// Shared shape for claim / person / concept / jargon evaluator batch
/// responses: an indexed list of verdicts against the submitted batch.
pub fn evaluator_batch_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["results"],
        "properties": {
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["ref", "score", "tier", "uncertain", "rationale", "evidence"],
                    "properties": {
                        "ref": { "type": "integer", "minimum": 0 },
                        "score": { "type": "number", "minimum": 0, "maximum": 1 },
                        "tier": { "type": "string", "enum": ["A", "B", "C", "reject"] },
                        "uncertain": { "type": "boolean" },
                        "rationale": { "type": "string" },
                        "evidence": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["char_start", "char_end"],
                                "properties": {
                                    "char_start": { "type": "integer", "minimum": 0 },
                                    "char_end": { "type": "integer", "minimum": 0 }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}
