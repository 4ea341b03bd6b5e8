//! Tiering rules per entity kind (spec §4.5). One function per kind rather
//! than a shared formula, since each kind's acceptance criteria differ in
//! kind, not just in threshold.

use claw_core::model::Tier;

use crate::types::{Outcome, PendingCandidate, RawTier, Verdict};

const MIN_LONG_EVIDENCE_CHARS: i64 = 20;
const MIN_CONCEPT_DEFINITION_WORDS: usize = 10;

/// Common English stoplist for jargon rejection: a word on this list is not
/// domain-specific by definition, regardless of what the model returned.
const COMMON_WORD_STOPLIST: &[&str] = &[
    "thing", "stuff", "people", "time", "way", "good", "bad", "big", "small", "money", "work",
];

fn has_long_evidence(verdict: &Verdict) -> bool {
    verdict
        .evidence
        .iter()
        .any(|(start, end)| end - start >= MIN_LONG_EVIDENCE_CHARS)
}

fn evidence_non_empty(verdict: &Verdict) -> bool {
    verdict.evidence.iter().any(|(start, end)| end > *start)
}

/// A candidate is "trivially uninformative" if it's too short to carry a
/// checkable assertion (a pleasantry, filler, or restatement of the prompt).
fn is_trivial(text: &str) -> bool {
    text.split_whitespace().count() < 4
}

pub fn tier_claim(candidate: &PendingCandidate, verdict: &Verdict) -> Outcome {
    if verdict.tier_hint == RawTier::Reject || !evidence_non_empty(verdict) {
        return Outcome::Rejected;
    }

    let tier = if verdict.score >= 0.80 && has_long_evidence(verdict) && !is_trivial(&candidate.canonical_text) {
        Some(Tier::A)
    } else if verdict.score >= 0.50 {
        Some(Tier::B)
    } else if verdict.tier_hint == RawTier::C {
        // Kept only because the evaluator explicitly flagged it as
        // supporting another claim; genuinely low-confidence candidates the
        // evaluator did not flag this way are dropped.
        Some(Tier::C)
    } else {
        None
    };

    match tier {
        Some(tier) => Outcome::Accepted {
            tier,
            scoring_json: serde_json::json!({
                "score": verdict.score,
                "rationale": verdict.rationale,
            }),
            evidence: verdict.evidence.clone(),
        },
        None => Outcome::Rejected,
    }
}

pub fn tier_person(_candidate: &PendingCandidate, verdict: &Verdict) -> Outcome {
    if verdict.tier_hint == RawTier::Reject || !evidence_non_empty(verdict) {
        return Outcome::Rejected;
    }
    accept_at_evaluator_tier(verdict)
}

pub fn tier_concept(candidate: &PendingCandidate, verdict: &Verdict) -> Outcome {
    if verdict.tier_hint == RawTier::Reject || !evidence_non_empty(verdict) {
        return Outcome::Rejected;
    }
    let definition = candidate
        .extra
        .get("definition")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if definition.split_whitespace().count() < MIN_CONCEPT_DEFINITION_WORDS {
        return Outcome::Rejected;
    }
    accept_at_evaluator_tier(verdict)
}

pub fn tier_jargon(candidate: &PendingCandidate, verdict: &Verdict) -> Outcome {
    if verdict.tier_hint == RawTier::Reject || !evidence_non_empty(verdict) {
        return Outcome::Rejected;
    }
    let term = candidate.canonical_text.trim().to_lowercase();
    if COMMON_WORD_STOPLIST.contains(&term.as_str()) {
        return Outcome::Rejected;
    }
    let has_definition = candidate
        .extra
        .get("definition")
        .and_then(|v| v.as_str())
        .map(|d| !d.trim().is_empty())
        .unwrap_or(false);
    if !has_definition {
        return Outcome::Rejected;
    }
    accept_at_evaluator_tier(verdict)
}

fn accept_at_evaluator_tier(verdict: &Verdict) -> Outcome {
    let tier = match verdict.tier_hint {
        RawTier::A => Tier::A,
        RawTier::B => Tier::B,
        RawTier::C => Tier::C,
        RawTier::Reject => unreachable!("reject handled by caller"),
    };
    Outcome::Accepted {
        tier,
        scoring_json: serde_json::json!({
            "score": verdict.score,
            "rationale": verdict.rationale,
        }),
        evidence: verdict.evidence.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str) -> PendingCandidate {
        PendingCandidate {
            segment_id: "seg-0".to_string(),
            segment_order: 0,
            canonical_text: text.to_string(),
            raw_text: text.to_string(),
            char_start: 0,
            char_end: text.len() as i64,
            extra: serde_json::json!({}),
        }
    }

    fn verdict(score: f64, tier_hint: RawTier, evidence_len: i64) -> Verdict {
        Verdict {
            score,
            tier_hint,
            uncertain: false,
            rationale: "test".to_string(),
            evidence: vec![(0, evidence_len)],
        }
    }

    #[test]
    fn high_score_with_long_evidence_is_tier_a() {
        let c = candidate("the economy will slow significantly next year");
        let v = verdict(0.9, RawTier::A, 30);
        match tier_claim(&c, &v) {
            Outcome::Accepted { tier, .. } => assert_eq!(tier, Tier::A),
            Outcome::Rejected => panic!("expected acceptance"),
        }
    }

    #[test]
    fn high_score_but_short_evidence_demotes_from_a() {
        let c = candidate("the economy will slow significantly next year");
        let v = verdict(0.9, RawTier::A, 5);
        match tier_claim(&c, &v) {
            Outcome::Accepted { tier, .. } => assert_eq!(tier, Tier::B),
            Outcome::Rejected => panic!("expected acceptance at B"),
        }
    }

    #[test]
    fn trivial_claim_text_is_demoted_from_a_even_with_high_score() {
        let c = candidate("yeah sure");
        let v = verdict(0.95, RawTier::A, 30);
        assert!(matches!(tier_claim(&c, &v), Outcome::Accepted { tier: Tier::B, .. }));
    }

    #[test]
    fn empty_evidence_rejects_regardless_of_score() {
        let c = candidate("a clear factual claim with enough words");
        let v = Verdict { evidence: vec![], ..verdict(0.9, RawTier::A, 0) };
        assert!(matches!(tier_claim(&c, &v), Outcome::Rejected));
    }

    #[test]
    fn jargon_common_word_is_rejected() {
        let mut c = candidate("stuff");
        c.extra = serde_json::json!({"definition": "a definition"});
        let v = verdict(0.9, RawTier::A, 20);
        assert!(matches!(tier_jargon(&c, &v), Outcome::Rejected));
    }

    #[test]
    fn concept_with_short_definition_is_rejected() {
        let mut c = candidate("efficient markets hypothesis");
        c.extra = serde_json::json!({"definition": "a market thing"});
        let v = verdict(0.9, RawTier::A, 20);
        assert!(matches!(tier_concept(&c, &v), Outcome::Rejected));
    }
}
