//! The data model shared by every crate in the workspace (spec §3).
//!
//! These are plain serde-friendly structs; persistence lives in `claw-store`
//! and validation against LLM-facing JSON schemas lives in `claw-schema`.
//! Nothing here owns a database handle or an HTTP client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Youtube,
    Audio,
    Video,
    Document,
    Rss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub source_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub uploader: Option<String>,
    pub duration_s: Option<f64>,
    pub url: Option<String>,
    pub file_hash_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    pub title: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl Episode {
    pub fn default_language() -> String {
        "en".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub episode_id: String,
    pub start_s: f64,
    pub end_s: f64,
    pub speaker: Option<String>,
    pub text: String,
}

impl Segment {
    /// `text[char_start..char_end]` by Unicode scalar (char) offsets, matching
    /// the offsets an LLM is instructed to cite against the segment text.
    pub fn slice(&self, char_start: usize, char_end: usize) -> Option<&str> {
        let mut char_indices = self.text.char_indices();
        let byte_start = char_indices.nth(char_start).map(|(b, _)| b)?;
        let byte_end = if char_end >= self.text.chars().count() {
            self.text.len()
        } else {
            self.text.char_indices().nth(char_end).map(|(b, _)| b)?
        };
        self.text.get(byte_start..byte_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    C,
    B,
    A,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    pub episode_id: String,
    pub segment_id: String,
    pub canonical_text: String,
    pub raw_text: String,
    pub tier: Tier,
    pub scoring_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub span_id: String,
    pub claim_id: String,
    pub segment_id: String,
    pub char_start: i64,
    pub char_end: i64,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: String,
    pub episode_id: String,
    pub display_name: String,
    pub role: Option<String>,
    pub mentions_json: serde_json::Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: String,
    pub episode_id: String,
    pub name: String,
    pub definition: String,
    pub first_segment_id: String,
    pub supporting_evidence_json: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JargonTerm {
    pub jargon_id: String,
    pub episode_id: String,
    pub term: String,
    pub definition: String,
    pub first_segment_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Supports,
    Contradicts,
    Refines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_id: String,
    pub from_claim: String,
    pub to_claim: String,
    pub kind: RelationKind,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Transcribe,
    Mine,
    Flagship,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Spec §3: `queued -> running`, `running -> succeeded`, `running -> failed`; nothing else.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub job_type: JobType,
    pub input_id: String,
    pub config_json: serde_json::Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub job_run_id: String,
    pub job_id: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub checkpoint_json: serde_json::Value,
    pub metrics_json: serde_json::Value,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequestRecord {
    pub request_id: String,
    pub job_run_id: String,
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub request_json: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponseRecord {
    pub request_id: String,
    pub status_code: i64,
    pub completion_tokens: Option<i64>,
    pub prompt_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub latency_ms: i64,
    pub response_json: serde_json::Value,
}

/// The bundle handed across the boundary from the (out of scope) transcription
/// collaborator: an episode plus its ordered segments (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeBundle {
    pub source_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub language: String,
    pub duration_s: Option<f64>,
    pub segments: Vec<Segment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_transitions() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Succeeded));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Succeeded.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn tier_ordering_puts_a_above_b_above_c() {
        assert!(Tier::A > Tier::B);
        assert!(Tier::B > Tier::C);
    }

    #[test]
    fn segment_slice_respects_char_offsets_not_bytes() {
        let seg = Segment {
            segment_id: "s1".into(),
            episode_id: "e1".into(),
            start_s: 0.0,
            end_s: 1.0,
            speaker: None,
            text: "café au lait".into(),
        };
        assert_eq!(seg.slice(0, 4), Some("café"));
    }
}
