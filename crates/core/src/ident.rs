//! Deterministic identifier derivation (spec component C1).
//!
//! `source_id` must be identical for byte-identical canonical input and never
//! collide in practice across distinct inputs at the corpus sizes this system
//! targets. The function is pure: no clock, no randomness, no I/O.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

const HASH_PREFIX_LEN: usize = 16;

fn hex_prefix(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..HASH_PREFIX_LEN].to_string()
}

/// `source_id` for a YouTube video: the platform's own identifier, unmodified.
pub fn youtube_source_id(video_id: &str) -> String {
    video_id.to_string()
}

/// `source_id` for a local audio file, derived from its raw bytes.
pub fn audio_source_id(file_bytes: &[u8]) -> String {
    format!("audio_{}", hex_prefix(file_bytes))
}

/// `source_id` for a local video file, derived from its raw bytes.
pub fn video_source_id(file_bytes: &[u8]) -> String {
    format!("video_{}", hex_prefix(file_bytes))
}

/// `source_id` for a document, derived from its normalized text.
///
/// Uses the same normalization as evidence-span matching (NFC + whitespace
/// collapse) so "canonical text" means one thing across this codebase.
pub fn document_source_id(raw_text: &str) -> String {
    let normalized = normalize_text(raw_text);
    format!("doc_{}", hex_prefix(normalized.as_bytes()))
}

/// `source_id` for an RSS feed item.
pub fn rss_source_id(feed_url: &str, guid: &str) -> String {
    let mut buf = String::with_capacity(feed_url.len() + guid.len());
    buf.push_str(feed_url);
    buf.push_str(guid);
    format!("rss_{}", hex_prefix(buf.as_bytes()))
}

/// Unicode NFC normalization plus whitespace collapse, shared by document
/// identifier hashing and evidence-span substring matching (spec §8.4).
pub fn normalize_text(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    let mut out = String::with_capacity(nfc.len());
    let mut last_was_space = false;
    for ch in nfc.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_id_is_passthrough() {
        assert_eq!(youtube_source_id("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn audio_id_is_deterministic() {
        let bytes = b"some fake wav bytes";
        assert_eq!(audio_source_id(bytes), audio_source_id(bytes));
    }

    #[test]
    fn audio_id_differs_for_different_bytes() {
        assert_ne!(audio_source_id(b"a"), audio_source_id(b"b"));
    }

    #[test]
    fn document_id_ignores_whitespace_differences() {
        let a = document_source_id("Hello   world\n\nfoo");
        let b = document_source_id("Hello world foo");
        assert_eq!(a, b);
    }

    #[test]
    fn document_id_prefix_and_length() {
        let id = document_source_id("anything");
        assert!(id.starts_with("doc_"));
        assert_eq!(id.len(), "doc_".len() + HASH_PREFIX_LEN);
    }

    #[test]
    fn rss_id_depends_on_both_inputs() {
        let a = rss_source_id("https://feed.example/a", "guid-1");
        let b = rss_source_id("https://feed.example/a", "guid-2");
        let c = rss_source_id("https://feed.example/b", "guid-1");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn normalize_collapses_whitespace_and_trims() {
        assert_eq!(normalize_text("  a\t b\n\nc  "), "a b c");
    }
}
