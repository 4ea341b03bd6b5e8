//! Core data model, deterministic identifiers, and the aggregate error type
//! shared by every crate in the claim-extraction pipeline workspace.

pub mod error;
pub mod ident;
pub mod model;

pub use error::{Error, Result};
pub use model::{
    Claim, Episode, EpisodeBundle, EvidenceSpan, Job, JobRun, JobStatus, JobType, JargonTerm,
    LlmRequestRecord, LlmResponseRecord, MediaSource, Person, Concept, Relation, RelationKind,
    Segment, SourceType, Tier,
};
