//! Segmentation (spec §4.6): reuses existing timestamped segments when the
//! bundle already has more than one, otherwise splits a single block of text
//! into target-length chunks at sentence boundaries.

use claw_core::model::{EpisodeBundle, Segment};

const TARGET_MIN_TOKENS: usize = 400;
const TARGET_MAX_TOKENS: usize = 800;

/// Same `chars / 3` heuristic used throughout this codebase to estimate
/// token counts without invoking a tokenizer.
fn estimate_tokens(text: &str) -> usize {
    text.len() / 3
}

/// Returns the segments to mine: the bundle's own segments if there's more
/// than one (already timestamped by the out-of-scope transcription step), or
/// a resegmentation of its single block of text into target-length chunks.
pub fn resolve_segments(bundle: &EpisodeBundle) -> Vec<Segment> {
    if bundle.segments.len() != 1 {
        return bundle.segments.clone();
    }

    let only = &bundle.segments[0];
    if estimate_tokens(&only.text) <= TARGET_MAX_TOKENS {
        return bundle.segments.clone();
    }

    chunk_text(&only.episode_id, &only.text, bundle.duration_s)
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let end = i + 1;
            let candidate = text[start..end].trim();
            if !candidate.is_empty() {
                sentences.push(candidate);
            }
            start = end;
        }
    }
    if start < text.len() {
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }
    sentences
}

fn chunk_text(episode_id: &str, text: &str, total_duration_s: Option<f64>) -> Vec<Segment> {
    let sentences = split_sentences(text);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        let prospective_tokens = estimate_tokens(&current) + estimate_tokens(sentence);
        if !current.is_empty() && prospective_tokens > TARGET_MAX_TOKENS {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        if estimate_tokens(&current) >= TARGET_MIN_TOKENS {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.to_string());
    }

    let total_chars: usize = chunks.iter().map(|c| c.len()).sum::<usize>().max(1);
    let mut elapsed_chars = 0usize;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let (start_s, end_s) = match total_duration_s {
                Some(duration) => {
                    let start = duration * (elapsed_chars as f64 / total_chars as f64);
                    elapsed_chars += chunk.len();
                    let end = duration * (elapsed_chars as f64 / total_chars as f64);
                    (start, end)
                }
                None => (0.0, 0.0),
            };
            Segment {
                segment_id: format!("chunk-{i}"),
                episode_id: episode_id.to_string(),
                start_s,
                end_s,
                speaker: None,
                text: chunk,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(sentence_count: usize) -> String {
        "The quick brown fox jumps over the lazy dog in the forest near the river. "
            .repeat(sentence_count)
    }

    #[test]
    fn short_single_segment_bundle_is_unchanged() {
        let bundle = EpisodeBundle {
            source_id: "s1".to_string(),
            source_type: claw_core::model::SourceType::Document,
            title: "T".to_string(),
            language: "en".to_string(),
            duration_s: None,
            segments: vec![Segment {
                segment_id: "seg-0".to_string(),
                episode_id: "s1".to_string(),
                start_s: 0.0,
                end_s: 0.0,
                speaker: None,
                text: "A short document.".to_string(),
            }],
        };
        let segments = resolve_segments(&bundle);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn long_single_segment_is_rechunked_into_target_range() {
        let bundle = EpisodeBundle {
            source_id: "s1".to_string(),
            source_type: claw_core::model::SourceType::Document,
            title: "T".to_string(),
            language: "en".to_string(),
            duration_s: Some(600.0),
            segments: vec![Segment {
                segment_id: "seg-0".to_string(),
                episode_id: "s1".to_string(),
                start_s: 0.0,
                end_s: 0.0,
                speaker: None,
                text: long_text(200),
            }],
        };
        let segments = resolve_segments(&bundle);
        assert!(segments.len() > 1);
        for seg in &segments {
            assert!(seg.end_s >= seg.start_s);
        }
    }

    #[test]
    fn multi_segment_bundle_is_passed_through_untouched() {
        let bundle = EpisodeBundle {
            source_id: "s1".to_string(),
            source_type: claw_core::model::SourceType::Audio,
            title: "T".to_string(),
            language: "en".to_string(),
            duration_s: Some(10.0),
            segments: vec![
                Segment { segment_id: "seg-0".to_string(), episode_id: "s1".to_string(), start_s: 0.0, end_s: 5.0, speaker: None, text: "a".to_string() },
                Segment { segment_id: "seg-1".to_string(), episode_id: "s1".to_string(), start_s: 5.0, end_s: 10.0, speaker: None, text: "b".to_string() },
            ],
        };
        assert_eq!(resolve_segments(&bundle).len(), 2);
    }
}
