//! Unified Miner (spec component C4): one LLM call per segment, with a
//! single repair attempt on schema failure and offset validation against the
//! segment's own text.

use std::sync::Arc;

use tracing::{instrument, warn};

use claw_core::ident::normalize_text;
use claw_core::model::Segment;
use claw_llm::{CancelToken, GenerateRequest, LlmAdapter, ModelUri, ResponseFormat};
use claw_schema::{build_repair_prompt, validate, SchemaName};

use crate::prompt::build_mining_prompt;
use crate::types::{ClaimCandidate, ConceptCandidate, JargonCandidate, MinerOutput, PersonCandidate};
use crate::MinerError;

pub struct Miner {
    adapter: Arc<LlmAdapter>,
}

impl Miner {
    pub fn new(adapter: Arc<LlmAdapter>) -> Self {
        Self { adapter }
    }

    /// Mines one segment, making at most one repair call if the first
    /// response fails schema validation (spec §4.4).
    #[instrument(skip(self, segment, cancel), fields(segment_id = %segment.segment_id))]
    pub async fn mine_segment(
        &self,
        job_run_id: &str,
        episode_title: &str,
        segment: &Segment,
        model: &ModelUri,
        temperature: f64,
        request_timeout_s: u64,
        cancel: &CancelToken,
    ) -> Result<MinerOutput, MinerError> {
        let prompt = build_mining_prompt(episode_title, segment.speaker.as_deref(), &segment.text);
        let request = GenerateRequest::new(model.clone(), prompt)
            .with_temperature(temperature)
            .with_response_format(ResponseFormat::Json)
            .with_timeout_s(request_timeout_s);

        let first = self.adapter.generate(job_run_id, request.clone(), cancel).await?;

        match self.parse_and_validate(&first.text) {
            Ok(obj) => return Ok(self.extract_and_filter(obj, segment)),
            Err(first_err) => {
                warn!(error = %first_err, "miner output failed schema validation, attempting repair");

                let errors = match &first_err {
                    MinerError::Schema(claw_schema::SchemaError::ValidationFailed { errors, .. }) => errors.clone(),
                    _ => vec![first_err.to_string()],
                };
                let repair_prompt = build_repair_prompt(SchemaName::MinerOutput, &first.text, &errors);
                let repair_request = GenerateRequest::new(model.clone(), repair_prompt)
                    .with_temperature(temperature)
                    .with_response_format(ResponseFormat::Json)
                    .with_timeout_s(request_timeout_s);

                let repaired = self.adapter.generate(job_run_id, repair_request, cancel).await?;
                match self.parse_and_validate(&repaired.text) {
                    Ok(obj) => Ok(self.extract_and_filter(obj, segment)),
                    Err(_) => {
                        warn!(segment_id = %segment.segment_id, "segment yields empty candidates after failed repair");
                        Ok(MinerOutput::default())
                    }
                }
            }
        }
    }

    fn parse_and_validate(&self, text: &str) -> Result<serde_json::Value, MinerError> {
        let obj: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| MinerError::Llm(claw_llm::LlmError::Parse(e.to_string())))?;
        validate(SchemaName::MinerOutput, &obj)?;
        Ok(obj)
    }

    /// Drops candidates whose cited offsets don't index into the segment text
    /// or whose quoted span doesn't match after whitespace normalization
    /// (spec §4.4 "Offset handling"). Never repaired, only dropped.
    fn extract_and_filter(&self, obj: serde_json::Value, segment: &Segment) -> MinerOutput {
        let mut output = MinerOutput::default();

        if let Some(claims) = obj.get("claims").and_then(|v| v.as_array()) {
            for c in claims {
                if let Some(candidate) = parse_claim(c) {
                    if offsets_valid(segment, candidate.char_start, candidate.char_end, &candidate.raw_text) {
                        output.claims.push(candidate);
                    }
                }
            }
        }
        if let Some(people) = obj.get("people").and_then(|v| v.as_array()) {
            for p in people {
                if let Some(candidate) = parse_person(p) {
                    if offsets_valid(segment, candidate.char_start, candidate.char_end, &candidate.display_name) {
                        output.people.push(candidate);
                    }
                }
            }
        }
        if let Some(jargon) = obj.get("jargon").and_then(|v| v.as_array()) {
            for j in jargon {
                if let Some(candidate) = parse_jargon(j) {
                    if offsets_valid(segment, candidate.char_start, candidate.char_end, &candidate.term) {
                        output.jargon.push(candidate);
                    }
                }
            }
        }
        if let Some(concepts) = obj.get("concepts").and_then(|v| v.as_array()) {
            for c in concepts {
                if let Some(candidate) = parse_concept(c) {
                    if offsets_valid(segment, candidate.char_start, candidate.char_end, &candidate.name) {
                        output.concepts.push(candidate);
                    }
                }
            }
        }

        output
    }
}

fn parse_claim(v: &serde_json::Value) -> Option<ClaimCandidate> {
    serde_json::from_value(v.clone()).ok()
}

fn parse_person(v: &serde_json::Value) -> Option<PersonCandidate> {
    serde_json::from_value(v.clone()).ok()
}

fn parse_jargon(v: &serde_json::Value) -> Option<JargonCandidate> {
    serde_json::from_value(v.clone()).ok()
}

fn parse_concept(v: &serde_json::Value) -> Option<ConceptCandidate> {
    serde_json::from_value(v.clone()).ok()
}

/// `text[char_start:char_end]` must exist and match `claimed_quote` after
/// whitespace normalization (spec §4.4, §8.4). Offsets index against the
/// quoted span itself (`raw_text`/`display_name`/`term`/`name`), not against
/// an unrelated field.
fn offsets_valid(segment: &Segment, char_start: usize, char_end: usize, claimed_quote: &str) -> bool {
    if char_end <= char_start {
        return false;
    }
    match segment.slice(char_start, char_end) {
        Some(actual) => normalize_text(actual) == normalize_text(claimed_quote),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_segment() -> Segment {
        Segment {
            segment_id: "seg-0".to_string(),
            episode_id: "ep-1".to_string(),
            start_s: 0.0,
            end_s: 5.0,
            speaker: Some("host".to_string()),
            text: "The sky is blue and the grass is green.".to_string(),
        }
    }

    #[test]
    fn offsets_valid_for_exact_substring() {
        let segment = sample_segment();
        assert!(offsets_valid(&segment, 0, 7, "The sky"));
    }

    #[test]
    fn offsets_invalid_when_quote_mismatches() {
        let segment = sample_segment();
        assert!(!offsets_valid(&segment, 0, 12, "something else"));
    }

    #[test]
    fn offsets_invalid_when_end_before_start() {
        let segment = sample_segment();
        assert!(!offsets_valid(&segment, 10, 5, "x"));
    }

    #[test]
    fn offsets_invalid_when_out_of_range() {
        let segment = sample_segment();
        assert!(!offsets_valid(&segment, 0, 10_000, "x"));
    }
}
