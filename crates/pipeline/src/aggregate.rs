//! Aggregation (spec §4.6 "Aggregation"): flattens per-segment miner
//! output into one candidate list per entity kind, removing cross-segment
//! duplicates by canonical text within a segment-proximity window.

use std::collections::HashMap;

use claw_core::ident::normalize_text;
use claw_evaluator::PendingCandidate;
use claw_miner::MinerOutput;

/// Two candidates with the same normalized text appearing within this many
/// segments of each other are treated as the same recurring mention rather
/// than two distinct claims (spec §4.6).
const PROXIMITY_WINDOW: usize = 3;

#[derive(Debug, Default)]
pub struct AggregatedCandidates {
    pub claims: Vec<PendingCandidate>,
    pub people: Vec<PendingCandidate>,
    pub jargon: Vec<PendingCandidate>,
    pub concepts: Vec<PendingCandidate>,
}

/// One segment's raw output plus the ordering info needed for proximity
/// dedup and claim tie-breaks.
pub struct SegmentOutput {
    pub segment_id: String,
    pub segment_order: usize,
    pub output: MinerOutput,
}

struct Dedup {
    last_seen_at: HashMap<String, usize>,
}

impl Dedup {
    fn new() -> Self {
        Self { last_seen_at: HashMap::new() }
    }

    /// Returns true if this occurrence should be kept (first sighting, or far
    /// enough from the last one to count as a distinct mention).
    fn keep(&mut self, canonical_text: &str, segment_order: usize) -> bool {
        let key = normalize_text(canonical_text).to_lowercase();
        match self.last_seen_at.get(&key) {
            Some(&last) if segment_order.saturating_sub(last) <= PROXIMITY_WINDOW => false,
            _ => {
                self.last_seen_at.insert(key, segment_order);
                true
            }
        }
    }
}

pub fn aggregate(segment_outputs: Vec<SegmentOutput>) -> AggregatedCandidates {
    let mut claims_dedup = Dedup::new();
    let mut people_dedup = Dedup::new();
    let mut jargon_dedup = Dedup::new();
    let mut concepts_dedup = Dedup::new();

    let mut result = AggregatedCandidates::default();

    for seg in segment_outputs {
        for c in seg.output.claims {
            if claims_dedup.keep(&c.canonical_text, seg.segment_order) {
                result.claims.push(PendingCandidate {
                    segment_id: seg.segment_id.clone(),
                    segment_order: seg.segment_order,
                    canonical_text: c.canonical_text,
                    raw_text: c.raw_text,
                    char_start: c.char_start as i64,
                    char_end: c.char_end as i64,
                    extra: serde_json::json!({}),
                });
            }
        }
        for p in seg.output.people {
            if people_dedup.keep(&p.display_name, seg.segment_order) {
                result.people.push(PendingCandidate {
                    segment_id: seg.segment_id.clone(),
                    segment_order: seg.segment_order,
                    canonical_text: p.display_name.clone(),
                    raw_text: p.display_name,
                    char_start: p.char_start as i64,
                    char_end: p.char_end as i64,
                    extra: serde_json::json!({ "role": p.role }),
                });
            }
        }
        for j in seg.output.jargon {
            if jargon_dedup.keep(&j.term, seg.segment_order) {
                result.jargon.push(PendingCandidate {
                    segment_id: seg.segment_id.clone(),
                    segment_order: seg.segment_order,
                    canonical_text: j.term.clone(),
                    raw_text: j.term,
                    char_start: j.char_start as i64,
                    char_end: j.char_end as i64,
                    extra: serde_json::json!({ "definition": j.definition }),
                });
            }
        }
        for concept in seg.output.concepts {
            if concepts_dedup.keep(&concept.name, seg.segment_order) {
                result.concepts.push(PendingCandidate {
                    segment_id: seg.segment_id.clone(),
                    segment_order: seg.segment_order,
                    canonical_text: concept.name.clone(),
                    raw_text: concept.name,
                    char_start: concept.char_start as i64,
                    char_end: concept.char_end as i64,
                    extra: serde_json::json!({ "definition": concept.definition }),
                });
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_miner::ClaimCandidate;

    fn output_with_claim(text: &str) -> MinerOutput {
        MinerOutput {
            claims: vec![ClaimCandidate {
                raw_text: text.to_string(),
                canonical_text: text.to_string(),
                char_start: 0,
                char_end: text.len(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn nearby_duplicate_claims_are_merged_away() {
        let outputs = vec![
            SegmentOutput { segment_id: "seg-0".to_string(), segment_order: 0, output: output_with_claim("inflation is rising") },
            SegmentOutput { segment_id: "seg-1".to_string(), segment_order: 1, output: output_with_claim("inflation is rising") },
        ];
        let aggregated = aggregate(outputs);
        assert_eq!(aggregated.claims.len(), 1);
        assert_eq!(aggregated.claims[0].segment_id, "seg-0");
    }

    #[test]
    fn distant_repeats_are_kept_as_distinct_mentions() {
        let outputs = vec![
            SegmentOutput { segment_id: "seg-0".to_string(), segment_order: 0, output: output_with_claim("inflation is rising") },
            SegmentOutput { segment_id: "seg-10".to_string(), segment_order: 10, output: output_with_claim("inflation is rising") },
        ];
        let aggregated = aggregate(outputs);
        assert_eq!(aggregated.claims.len(), 2);
    }
}
