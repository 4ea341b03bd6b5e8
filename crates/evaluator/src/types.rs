//! Evaluator-facing types: one candidate queued for scoring, and the
//! verdict an evaluator batch call returns for it (spec §4.5, §6).

use claw_core::model::Tier;

/// A raw candidate plus the segment context needed to build evidence spans
/// and to resolve claim/claim tie-breaks by "earlier segment".
#[derive(Debug, Clone)]
pub struct PendingCandidate {
    pub segment_id: String,
    pub segment_order: usize,
    pub canonical_text: String,
    pub raw_text: String,
    pub char_start: i64,
    pub char_end: i64,
    /// Extra fields a specific entity kind needs (e.g. a jargon definition).
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Verdict {
    pub score: f64,
    pub tier_hint: RawTier,
    pub uncertain: bool,
    pub rationale: String,
    pub evidence: Vec<(i64, i64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTier {
    A,
    B,
    C,
    Reject,
}

impl RawTier {
    pub fn parse(s: &str) -> Self {
        match s {
            "A" => RawTier::A,
            "B" => RawTier::B,
            "C" => RawTier::C,
            _ => RawTier::Reject,
        }
    }
}

/// The outcome of evaluating one candidate: either it is accepted at a tier
/// with resolved evidence, or it is discarded.
pub enum Outcome {
    Accepted { tier: Tier, scoring_json: serde_json::Value, evidence: Vec<(i64, i64)> },
    Rejected,
}
