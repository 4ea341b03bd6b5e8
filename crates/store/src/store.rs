//! Episode/Segment Store (spec component C2): a single writer connection
//! guarded by a mutex, a pooled set of read-only connections, one
//! transaction per atomic operation.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument};

use claw_core::model::{
    Claim, Concept, EpisodeBundle, EvidenceSpan, JargonTerm, Job, JobRun, JobStatus,
    JobType, MediaSource, Person, Segment, SourceType, Tier,
};

use crate::schema::open_and_migrate;
use crate::StoreError;

/// Candidate outputs for one `(episode_id, job_type)` pass, as handed to
/// `upsert_pipeline_outputs` (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct PipelineOutputs {
    pub claims: Vec<(Claim, Vec<EvidenceSpan>)>,
    pub people: Vec<Person>,
    pub concepts: Vec<Concept>,
    pub jargon: Vec<JargonTerm>,
}

pub struct Store {
    writer: Mutex<Connection>,
    readers: Pool<SqliteConnectionManager>,
}

fn source_type_str(st: SourceType) -> &'static str {
    match st {
        SourceType::Youtube => "youtube",
        SourceType::Audio => "audio",
        SourceType::Video => "video",
        SourceType::Document => "document",
        SourceType::Rss => "rss",
    }
}

fn parse_source_type(s: &str) -> Result<SourceType, StoreError> {
    match s {
        "youtube" => Ok(SourceType::Youtube),
        "audio" => Ok(SourceType::Audio),
        "video" => Ok(SourceType::Video),
        "document" => Ok(SourceType::Document),
        "rss" => Ok(SourceType::Rss),
        other => Err(StoreError::Integrity(format!("unknown source_type: {other}"))),
    }
}

fn tier_str(t: Tier) -> &'static str {
    match t {
        Tier::A => "A",
        Tier::B => "B",
        Tier::C => "C",
    }
}

fn parse_tier(s: &str) -> Result<Tier, StoreError> {
    match s {
        "A" => Ok(Tier::A),
        "B" => Ok(Tier::B),
        "C" => Ok(Tier::C),
        other => Err(StoreError::Integrity(format!("unknown tier: {other}"))),
    }
}

fn job_type_str(jt: JobType) -> &'static str {
    match jt {
        JobType::Transcribe => "transcribe",
        JobType::Mine => "mine",
        JobType::Flagship => "flagship",
        JobType::Pipeline => "pipeline",
    }
}

fn parse_job_type(s: &str) -> Result<JobType, StoreError> {
    match s {
        "transcribe" => Ok(JobType::Transcribe),
        "mine" => Ok(JobType::Mine),
        "flagship" => Ok(JobType::Flagship),
        "pipeline" => Ok(JobType::Pipeline),
        other => Err(StoreError::Integrity(format!("unknown job_type: {other}"))),
    }
}

fn job_status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Succeeded => "succeeded",
        JobStatus::Failed => "failed",
    }
}

fn parse_job_status(s: &str) -> Result<JobStatus, StoreError> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "succeeded" => Ok(JobStatus::Succeeded),
        "failed" => Ok(JobStatus::Failed),
        other => Err(StoreError::Integrity(format!("unknown job status: {other}"))),
    }
}

impl Store {
    /// Opens (or creates) the SQLite database at `path`. WAL mode, one
    /// dedicated writer, a small pool of read-only connections.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>, StoreError> {
        let path = path.as_ref();
        let writer = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        open_and_migrate(&writer)?;

        let manager = SqliteConnectionManager::file(path).with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        );
        let readers = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Arc::new(Self {
            writer: Mutex::new(writer),
            readers,
        }))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Arc<Self>, StoreError> {
        let writer = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        open_and_migrate(&writer)?;
        // A pool backed by the same in-memory file is not meaningful; tests
        // that need reader access go through the writer connection directly.
        let manager = SqliteConnectionManager::memory();
        let readers = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Arc::new(Self {
            writer: Mutex::new(writer),
            readers,
        }))
    }

    /// Direct writer access for the audit sink, which writes from a
    /// `spawn_blocking` task rather than through one of the operations above.
    pub fn writer_for_audit(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.writer.lock()
    }

    #[instrument(skip(self, fields))]
    pub fn upsert_source(&self, source_id: &str, fields: &MediaSource) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO media_sources (source_id, source_type, title, uploader, duration_s, url, file_hash_sha256)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(source_id) DO UPDATE SET
                source_type = excluded.source_type,
                title = excluded.title,
                uploader = excluded.uploader,
                duration_s = excluded.duration_s,
                url = excluded.url,
                file_hash_sha256 = excluded.file_hash_sha256",
            params![
                source_id,
                source_type_str(fields.source_type),
                fields.title,
                fields.uploader,
                fields.duration_s,
                fields.url,
                fields.file_hash_sha256,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn upsert_episode(&self, episode_id: &str, title: &str, language: &str) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO episodes (episode_id, title, language, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(episode_id) DO UPDATE SET title = excluded.title, language = excluded.language",
            params![episode_id, title, language, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomic: deletes existing segments for `episode_id`, inserts the new
    /// ones, validates non-overlap and sort order (spec §3 invariant).
    pub fn replace_segments(&self, episode_id: &str, segments: &[Segment]) -> Result<(), StoreError> {
        for pair in segments.windows(2) {
            if pair[0].end_s > pair[1].start_s {
                return Err(StoreError::Integrity(format!(
                    "segments for {episode_id} overlap or are out of order: {} ends after {} starts",
                    pair[0].segment_id, pair[1].segment_id
                )));
            }
        }

        let mut conn = self.writer.lock();
        let tx = conn.transaction().map_err(|e| StoreError::Database(e.to_string()))?;
        tx.execute("DELETE FROM segments WHERE episode_id = ?1", params![episode_id])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        for seg in segments {
            tx.execute(
                "INSERT INTO segments (segment_id, episode_id, start_s, end_s, speaker, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![seg.segment_id, episode_id, seg.start_s, seg.end_s, seg.speaker, seg.text],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomic per episode: deletes prior outputs keyed by `(episode_id,
    /// job_type)`, inserts new ones, rebuilds FTS entries (spec §4.2).
    pub fn upsert_pipeline_outputs(
        &self,
        episode_id: &str,
        outputs: &PipelineOutputs,
    ) -> Result<(), StoreError> {
        let mut conn = self.writer.lock();
        let tx = conn.transaction().map_err(|e| StoreError::Database(e.to_string()))?;

        // Clear prior claims (and their evidence/FTS rows via cascade/manual delete).
        {
            let mut stmt = tx
                .prepare("SELECT claim_id FROM claims WHERE episode_id = ?1")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let claim_ids: Vec<String> = stmt
                .query_map(params![episode_id], |row| row.get(0))
                .map_err(|e| StoreError::Database(e.to_string()))?
                .collect::<rusqlite::Result<_>>()
                .map_err(|e| StoreError::Database(e.to_string()))?;
            for claim_id in &claim_ids {
                tx.execute("DELETE FROM claims_fts WHERE claim_id = ?1", params![claim_id])
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }
        tx.execute(
            "DELETE FROM evidence_spans WHERE claim_id IN (SELECT claim_id FROM claims WHERE episode_id = ?1)",
            params![episode_id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        tx.execute("DELETE FROM claims WHERE episode_id = ?1", params![episode_id])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tx.execute("DELETE FROM people WHERE episode_id = ?1", params![episode_id])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tx.execute("DELETE FROM concepts WHERE episode_id = ?1", params![episode_id])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tx.execute("DELETE FROM jargon WHERE episode_id = ?1", params![episode_id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for (claim, spans) in &outputs.claims {
            tx.execute(
                "INSERT INTO claims (claim_id, episode_id, segment_id, canonical_text, raw_text, tier, scoring_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    claim.claim_id,
                    claim.episode_id,
                    claim.segment_id,
                    claim.canonical_text,
                    claim.raw_text,
                    tier_str(claim.tier),
                    claim.scoring_json.to_string(),
                    claim.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

            tx.execute(
                "INSERT INTO claims_fts (claim_id, canonical_text) VALUES (?1, ?2)",
                params![claim.claim_id, claim.canonical_text],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

            for span in spans {
                tx.execute(
                    "INSERT INTO evidence_spans (span_id, claim_id, segment_id, char_start, char_end, quote)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![span.span_id, span.claim_id, span.segment_id, span.char_start, span.char_end, span.quote],
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;

                tx.execute(
                    "INSERT INTO evidence_fts (span_id, quote) VALUES (?1, ?2)",
                    params![span.span_id, span.quote],
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }

        for person in &outputs.people {
            tx.execute(
                "INSERT INTO people (person_id, episode_id, display_name, role, mentions_json, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    person.person_id,
                    person.episode_id,
                    person.display_name,
                    person.role,
                    person.mentions_json.to_string(),
                    person.description,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        for concept in &outputs.concepts {
            tx.execute(
                "INSERT INTO concepts (concept_id, episode_id, name, definition, first_segment_id, supporting_evidence_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    concept.concept_id,
                    concept.episode_id,
                    concept.name,
                    concept.definition,
                    concept.first_segment_id,
                    concept.supporting_evidence_json.to_string(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        for jargon in &outputs.jargon {
            tx.execute(
                "INSERT INTO jargon (jargon_id, episode_id, term, definition, first_segment_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![jargon.jargon_id, jargon.episode_id, jargon.term, jargon.definition, jargon.first_segment_id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;
        debug!(episode_id, claims = outputs.claims.len(), "upserted pipeline outputs");
        Ok(())
    }

    pub fn get_episode_bundle(&self, episode_id: &str) -> Result<EpisodeBundle, StoreError> {
        let conn = self.writer.lock();
        let (title, language, source_type): (String, String, String) = conn
            .query_row(
                "SELECT e.title, e.language, m.source_type
                 FROM episodes e JOIN media_sources m ON m.source_id = e.episode_id
                 WHERE e.episode_id = ?1",
                params![episode_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(episode_id.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT segment_id, start_s, end_s, speaker, text FROM segments
                 WHERE episode_id = ?1 ORDER BY start_s ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let segments = stmt
            .query_map(params![episode_id], |row| {
                Ok(Segment {
                    segment_id: row.get(0)?,
                    episode_id: episode_id.to_string(),
                    start_s: row.get(1)?,
                    end_s: row.get(2)?,
                    speaker: row.get(3)?,
                    text: row.get(4)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(EpisodeBundle {
            source_id: episode_id.to_string(),
            source_type: parse_source_type(&source_type)?,
            title,
            language,
            duration_s: None,
            segments,
        })
    }

    /// FTS search over claim `canonical_text`, optionally filtered to one episode.
    pub fn search_claims(&self, query: &str, episode_id: Option<&str>) -> Result<Vec<String>, StoreError> {
        let conn = self.writer.lock();
        let mut stmt = conn
            .prepare(
                "SELECT c.claim_id FROM claims_fts f
                 JOIN claims c ON c.claim_id = f.claim_id
                 WHERE f.canonical_text MATCH ?1
                   AND (?2 IS NULL OR c.episode_id = ?2)
                 ORDER BY rank",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let ids = stmt
            .query_map(params![query, episode_id], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(ids)
    }

    /// Returns claims for `episode_id` at or above `min_tier` (A is the
    /// highest tier, C the lowest; see `Tier`'s `Ord` impl).
    pub fn get_claims_by_tier(&self, episode_id: &str, min_tier: Tier) -> Result<Vec<Claim>, StoreError> {
        let conn = self.writer.lock();
        let mut stmt = conn
            .prepare(
                "SELECT claim_id, episode_id, segment_id, canonical_text, raw_text, tier, scoring_json, created_at
                 FROM claims WHERE episode_id = ?1",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        // SQLite's TEXT comparison of 'A'/'B'/'C' doesn't match Tier's Ord
        // (C < B < A), so tier filtering happens in Rust below.
        let rows = stmt
            .query_map(params![episode_id], |row| {
                let tier_s: String = row.get(5)?;
                Ok((
                    Claim {
                        claim_id: row.get(0)?,
                        episode_id: row.get(1)?,
                        segment_id: row.get(2)?,
                        canonical_text: row.get(3)?,
                        raw_text: row.get(4)?,
                        tier: Tier::C, // placeholder, corrected below
                        scoring_json: serde_json::from_str(&row.get::<_, String>(6)?).unwrap_or(serde_json::Value::Null),
                        created_at: row
                            .get::<_, String>(7)?
                            .parse()
                            .unwrap_or_else(|_| Utc::now()),
                    },
                    tier_s,
                ))
            })
            .map_err(|e| StoreError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut claims = Vec::new();
        for (mut claim, tier_s) in rows {
            claim.tier = parse_tier(&tier_s)?;
            if claim.tier >= min_tier {
                claims.push(claim);
            }
        }
        Ok(claims)
    }

    pub fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO jobs (job_id, job_type, input_id, config_json, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job.job_id,
                job_type_str(job.job_type),
                job.input_id,
                job.config_json.to_string(),
                job_status_str(job.status),
                job.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, StoreError> {
        let conn = self.writer.lock();
        let row = conn
            .query_row(
                "SELECT job_id, job_type, input_id, config_json, status, created_at FROM jobs WHERE job_id = ?1",
                params![job_id],
                |row| {
                    let job_type: String = row.get(1)?;
                    let config_json: String = row.get(3)?;
                    let status: String = row.get(4)?;
                    let created_at: String = row.get(5)?;
                    Ok((row.get::<_, String>(0)?, job_type, row.get::<_, String>(2)?, config_json, status, created_at))
                },
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;

        let (job_id, job_type, input_id, config_json, status, created_at) = row;
        Ok(Job {
            job_id,
            job_type: parse_job_type(&job_type)?,
            input_id,
            config_json: serde_json::from_str(&config_json).unwrap_or(serde_json::Value::Null),
            status: parse_job_status(&status)?,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Applies a status transition, rejecting illegal ones (spec §3).
    pub fn update_job_status(&self, job_id: &str, next: JobStatus) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        let current: String = conn
            .query_row("SELECT status FROM jobs WHERE job_id = ?1", params![job_id], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        let current = parse_job_status(&current)?;
        if !current.can_transition_to(next) {
            return Err(StoreError::Integrity(format!(
                "illegal job status transition {current:?} -> {next:?}"
            )));
        }
        conn.execute(
            "UPDATE jobs SET status = ?1 WHERE job_id = ?2",
            params![job_status_str(next), job_id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn create_job_run(&self, run: &JobRun) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO job_runs (job_run_id, job_id, status, started_at, completed_at, checkpoint_json, metrics_json, error_code, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.job_run_id,
                run.job_id,
                job_status_str(run.status),
                run.started_at.to_rfc3339(),
                run.completed_at.map(|t| t.to_rfc3339()),
                run.checkpoint_json.to_string(),
                run.metrics_json.to_string(),
                run.error_code,
                run.error_message,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn update_job_run_checkpoint(&self, job_run_id: &str, checkpoint: &serde_json::Value) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "UPDATE job_runs SET checkpoint_json = ?1 WHERE job_run_id = ?2",
            params![checkpoint.to_string(), job_run_id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn complete_job_run(
        &self,
        job_run_id: &str,
        status: JobStatus,
        metrics: &serde_json::Value,
        error_code: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.writer.lock();
        conn.execute(
            "UPDATE job_runs SET status = ?1, completed_at = ?2, metrics_json = ?3, error_code = ?4, error_message = ?5
             WHERE job_run_id = ?6",
            params![
                job_status_str(status),
                Utc::now().to_rfc3339(),
                metrics.to_string(),
                error_code,
                error_message,
                job_run_id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn latest_job_run(&self, job_id: &str) -> Result<Option<JobRun>, StoreError> {
        let conn = self.writer.lock();
        conn.query_row(
            "SELECT job_run_id, job_id, status, started_at, completed_at, checkpoint_json, metrics_json, error_code, error_message
             FROM job_runs WHERE job_id = ?1 ORDER BY started_at DESC LIMIT 1",
            params![job_id],
            |row| {
                let status_s: String = row.get(2)?;
                let started_s: String = row.get(3)?;
                let completed_s: Option<String> = row.get(4)?;
                let checkpoint_s: String = row.get(5)?;
                let metrics_s: String = row.get(6)?;
                Ok(JobRun {
                    job_run_id: row.get(0)?,
                    job_id: row.get(1)?,
                    status: parse_job_status(&status_s).unwrap_or(JobStatus::Failed),
                    started_at: started_s.parse().unwrap_or_else(|_| Utc::now()),
                    completed_at: completed_s.and_then(|s| s.parse().ok()),
                    checkpoint_json: serde_json::from_str(&checkpoint_s).unwrap_or(serde_json::Value::Null),
                    metrics_json: serde_json::from_str(&metrics_s).unwrap_or(serde_json::Value::Null),
                    error_code: row.get(7)?,
                    error_message: row.get(8)?,
                })
            },
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_core::ident::document_source_id;

    fn seed_episode(store: &Store, episode_id: &str) {
        store
            .upsert_source(
                episode_id,
                &MediaSource {
                    source_id: episode_id.to_string(),
                    source_type: SourceType::Document,
                    title: "Test Episode".to_string(),
                    uploader: None,
                    duration_s: None,
                    url: None,
                    file_hash_sha256: None,
                },
            )
            .unwrap();
        store.upsert_episode(episode_id, "Test Episode", "en").unwrap();
    }

    fn sample_segments(episode_id: &str) -> Vec<Segment> {
        vec![
            Segment {
                segment_id: "seg-0".to_string(),
                episode_id: episode_id.to_string(),
                start_s: 0.0,
                end_s: 5.0,
                speaker: Some("host".to_string()),
                text: "Welcome to the show.".to_string(),
            },
            Segment {
                segment_id: "seg-1".to_string(),
                episode_id: episode_id.to_string(),
                start_s: 5.0,
                end_s: 10.0,
                speaker: Some("guest".to_string()),
                text: "Thanks for having me.".to_string(),
            },
        ]
    }

    #[test]
    fn replace_segments_is_idempotent_on_rerun() {
        let store = Store::open_in_memory().unwrap();
        let episode_id = document_source_id("ep-1");
        seed_episode(&store, &episode_id);

        store.replace_segments(&episode_id, &sample_segments(&episode_id)).unwrap();
        store.replace_segments(&episode_id, &sample_segments(&episode_id)).unwrap();

        let bundle = store.get_episode_bundle(&episode_id).unwrap();
        assert_eq!(bundle.segments.len(), 2);
    }

    #[test]
    fn replace_segments_rejects_overlap() {
        let store = Store::open_in_memory().unwrap();
        let episode_id = document_source_id("ep-overlap");
        seed_episode(&store, &episode_id);

        let mut segments = sample_segments(&episode_id);
        segments[1].start_s = 2.0; // now overlaps segment 0's [0, 5)

        let err = store.replace_segments(&episode_id, &segments).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
    }

    #[test]
    fn get_episode_bundle_missing_episode_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_episode_bundle("does-not-exist").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn upsert_pipeline_outputs_replaces_prior_run_atomically() {
        let store = Store::open_in_memory().unwrap();
        let episode_id = document_source_id("ep-claims");
        seed_episode(&store, &episode_id);
        store.replace_segments(&episode_id, &sample_segments(&episode_id)).unwrap();

        let first_claim = Claim {
            claim_id: "claim-1".to_string(),
            episode_id: episode_id.clone(),
            segment_id: "seg-0".to_string(),
            canonical_text: "the show starts on time".to_string(),
            raw_text: "Welcome to the show.".to_string(),
            tier: Tier::B,
            scoring_json: serde_json::json!({}),
            created_at: Utc::now(),
        };
        let span = EvidenceSpan {
            span_id: "span-1".to_string(),
            claim_id: "claim-1".to_string(),
            segment_id: "seg-0".to_string(),
            char_start: 0,
            char_end: 7,
            quote: "Welcome".to_string(),
        };
        let outputs = PipelineOutputs {
            claims: vec![(first_claim, vec![span])],
            ..Default::default()
        };
        store.upsert_pipeline_outputs(&episode_id, &outputs).unwrap();

        let claims = store.get_claims_by_tier(&episode_id, Tier::C).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].tier, Tier::B);

        // Re-running with zero claims must clear the prior run, not append.
        store
            .upsert_pipeline_outputs(&episode_id, &PipelineOutputs::default())
            .unwrap();
        let claims = store.get_claims_by_tier(&episode_id, Tier::C).unwrap();
        assert!(claims.is_empty());
    }

    #[test]
    fn search_claims_finds_by_canonical_text() {
        let store = Store::open_in_memory().unwrap();
        let episode_id = document_source_id("ep-search");
        seed_episode(&store, &episode_id);
        store.replace_segments(&episode_id, &sample_segments(&episode_id)).unwrap();

        let claim = Claim {
            claim_id: "claim-search".to_string(),
            episode_id: episode_id.clone(),
            segment_id: "seg-0".to_string(),
            canonical_text: "inflation will rise next quarter".to_string(),
            raw_text: "inflation will rise next quarter".to_string(),
            tier: Tier::A,
            scoring_json: serde_json::json!({}),
            created_at: Utc::now(),
        };
        let outputs = PipelineOutputs {
            claims: vec![(claim, vec![])],
            ..Default::default()
        };
        store.upsert_pipeline_outputs(&episode_id, &outputs).unwrap();

        let hits = store.search_claims("inflation", Some(&episode_id)).unwrap();
        assert_eq!(hits, vec!["claim-search".to_string()]);

        let misses = store.search_claims("bananas", Some(&episode_id)).unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn job_status_transition_rejects_illegal_moves() {
        let store = Store::open_in_memory().unwrap();
        let job = Job {
            job_id: "job-1".to_string(),
            job_type: JobType::Pipeline,
            input_id: "ep-1".to_string(),
            config_json: serde_json::json!({}),
            status: JobStatus::Queued,
            created_at: Utc::now(),
        };
        store.create_job(&job).unwrap();

        store.update_job_status("job-1", JobStatus::Running).unwrap();
        let err = store.update_job_status("job-1", JobStatus::Queued).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));

        store.update_job_status("job-1", JobStatus::Succeeded).unwrap();
        let fetched = store.get_job("job-1").unwrap();
        assert_eq!(fetched.status, JobStatus::Succeeded);
    }

    #[test]
    fn job_run_lifecycle_records_checkpoint_and_completion() {
        let store = Store::open_in_memory().unwrap();
        let job = Job {
            job_id: "job-2".to_string(),
            job_type: JobType::Mine,
            input_id: "ep-1".to_string(),
            config_json: serde_json::json!({}),
            status: JobStatus::Queued,
            created_at: Utc::now(),
        };
        store.create_job(&job).unwrap();

        let run = JobRun {
            job_run_id: "run-1".to_string(),
            job_id: "job-2".to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            checkpoint_json: serde_json::json!({}),
            metrics_json: serde_json::json!({}),
            error_code: None,
            error_message: None,
        };
        store.create_job_run(&run).unwrap();
        store
            .update_job_run_checkpoint("run-1", &serde_json::json!({"segments_done": 3}))
            .unwrap();
        store
            .complete_job_run("run-1", JobStatus::Succeeded, &serde_json::json!({"claims": 5}), None, None)
            .unwrap();

        let latest = store.latest_job_run("job-2").unwrap().unwrap();
        assert_eq!(latest.status, JobStatus::Succeeded);
        assert_eq!(latest.checkpoint_json, serde_json::json!({"segments_done": 3}));
        assert_eq!(latest.metrics_json, serde_json::json!({"claims": 5}));
    }
}
