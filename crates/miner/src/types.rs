//! The raw, un-evaluated candidate sets a single mining call produces
//! (spec §4.4 "Output contract"). These are not yet tiered or persisted;
//! `claw-evaluator` consumes them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimCandidate {
    pub raw_text: String,
    pub canonical_text: String,
    pub char_start: usize,
    pub char_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCandidate {
    pub display_name: String,
    pub role: Option<String>,
    pub char_start: usize,
    pub char_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JargonCandidate {
    pub term: String,
    pub definition: String,
    pub char_start: usize,
    pub char_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCandidate {
    pub name: String,
    pub definition: String,
    pub char_start: usize,
    pub char_end: usize,
}

/// One segment's worth of raw candidates, keyed by `segment_id` by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerOutput {
    pub claims: Vec<ClaimCandidate>,
    pub people: Vec<PersonCandidate>,
    pub jargon: Vec<JargonCandidate>,
    pub concepts: Vec<ConceptCandidate>,
}
