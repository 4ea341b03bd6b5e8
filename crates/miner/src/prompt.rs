//! Prompt construction for the unified mining call (spec §4.4).

/// Builds the one prompt the miner sends per segment. Instructs the model to
/// return exactly the four-key JSON object the miner output schema expects,
/// citing evidence by character offset into the segment text supplied here.
pub fn build_mining_prompt(episode_title: &str, speaker: Option<&str>, segment_text: &str) -> String {
    let speaker_line = speaker
        .map(|s| format!("Speaker: {s}\n"))
        .unwrap_or_default();

    format!(
        "You are extracting structured information from one segment of a transcript.\n\
         Episode: {episode_title}\n\
         {speaker_line}\
         Segment text (cite offsets against this exact text):\n\
         ---\n{segment_text}\n---\n\n\
         Return a single JSON object with exactly four keys: \"claims\", \"people\", \"jargon\", \"concepts\".\n\
         - claims: array of {{raw_text, canonical_text, char_start, char_end}} — distinct, checkable factual assertions.\n\
         - people: array of {{display_name, role, char_start, char_end}} — named individuals mentioned.\n\
         - jargon: array of {{term, definition, char_start, char_end}} — domain-specific terms used.\n\
         - concepts: array of {{name, definition, char_start, char_end}} — ideas or concepts explained.\n\
         char_start and char_end are zero-based character offsets into the segment text above, and \
         text[char_start:char_end] must reproduce the cited span verbatim (modulo whitespace).\n\
         Return ONLY the JSON object. No markdown fences, no commentary."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_segment_text_and_title() {
        let prompt = build_mining_prompt("The Show", Some("host"), "Hello world.");
        assert!(prompt.contains("The Show"));
        assert!(prompt.contains("Hello world."));
        assert!(prompt.contains("Speaker: host"));
    }

    #[test]
    fn prompt_omits_speaker_line_when_unknown() {
        let prompt = build_mining_prompt("The Show", None, "Hello world.");
        assert!(!prompt.contains("Speaker:"));
    }
}
