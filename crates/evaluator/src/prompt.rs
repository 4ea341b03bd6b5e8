//! Evaluator batch prompt construction (spec §4.5).

use crate::types::PendingCandidate;

/// Builds the prompt for one batch of `kind` candidates. `kind` names the
/// rubric ("claim", "person", "concept", "jargon") so the model applies the
/// right acceptance criteria.
pub fn build_evaluator_prompt(kind: &str, episode_title: &str, batch: &[PendingCandidate]) -> String {
    let mut items = String::new();
    for (i, candidate) in batch.iter().enumerate() {
        items.push_str(&format!(
            "{i}: \"{}\" (segment {})\n",
            candidate.canonical_text, candidate.segment_id
        ));
    }

    format!(
        "You are scoring {kind} candidates extracted from the episode \"{episode_title}\".\n\
         For each candidate below, decide whether to keep it and assign a confidence score in [0, 1].\n\
         Candidates:\n{items}\n\
         Return a single JSON object: {{\"results\": [...]}}, one entry per candidate in the same order, each with:\n\
         - ref: the candidate's index above\n\
         - score: confidence in [0, 1]\n\
         - tier: one of \"A\", \"B\", \"C\", \"reject\"\n\
         - uncertain: true if you are not confident in this score and a stronger model should re-check it\n\
         - rationale: one sentence\n\
         - evidence: array of {{char_start, char_end}} spans supporting it\n\
         Return ONLY the JSON object. No markdown fences, no commentary."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_candidate_by_index() {
        let batch = vec![
            PendingCandidate {
                segment_id: "seg-0".to_string(),
                segment_order: 0,
                canonical_text: "claim one".to_string(),
                raw_text: "claim one".to_string(),
                char_start: 0,
                char_end: 9,
                extra: serde_json::json!({}),
            },
            PendingCandidate {
                segment_id: "seg-1".to_string(),
                segment_order: 1,
                canonical_text: "claim two".to_string(),
                raw_text: "claim two".to_string(),
                char_start: 0,
                char_end: 9,
                extra: serde_json::json!({}),
            },
        ];
        let prompt = build_evaluator_prompt("claim", "The Show", &batch);
        assert!(prompt.contains("0: \"claim one\""));
        assert!(prompt.contains("1: \"claim two\""));
    }
}
