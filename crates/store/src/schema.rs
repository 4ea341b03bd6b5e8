//! Versioned schema migrations. Opening a database whose recorded
//! `schema_migrations` version is newer than `CURRENT_SCHEMA_VERSION` is a
//! hard error (spec §4.2, §6): this code never silently downgrades.

use rusqlite::Connection;

use crate::StoreError;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const MIGRATION_1: &str = r#"
CREATE TABLE IF NOT EXISTS media_sources (
    source_id TEXT PRIMARY KEY,
    source_type TEXT NOT NULL CHECK (source_type IN ('youtube','audio','video','document','rss')),
    title TEXT NOT NULL,
    uploader TEXT,
    duration_s REAL,
    url TEXT,
    file_hash_sha256 TEXT
);

CREATE TABLE IF NOT EXISTS episodes (
    episode_id TEXT PRIMARY KEY REFERENCES media_sources(source_id),
    title TEXT NOT NULL,
    language TEXT NOT NULL DEFAULT 'en',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS segments (
    segment_id TEXT NOT NULL,
    episode_id TEXT NOT NULL REFERENCES episodes(episode_id) ON DELETE CASCADE,
    start_s REAL NOT NULL,
    end_s REAL NOT NULL CHECK (end_s > start_s),
    speaker TEXT,
    text TEXT NOT NULL,
    PRIMARY KEY (episode_id, segment_id)
);
CREATE INDEX IF NOT EXISTS idx_segments_episode_order ON segments(episode_id, start_s);

CREATE TABLE IF NOT EXISTS claims (
    claim_id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(episode_id) ON DELETE CASCADE,
    segment_id TEXT NOT NULL,
    canonical_text TEXT NOT NULL,
    raw_text TEXT NOT NULL,
    tier TEXT NOT NULL CHECK (tier IN ('A','B','C')),
    scoring_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_claims_episode ON claims(episode_id);
CREATE INDEX IF NOT EXISTS idx_claims_episode_tier ON claims(episode_id, tier);

CREATE TABLE IF NOT EXISTS evidence_spans (
    span_id TEXT PRIMARY KEY,
    claim_id TEXT NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    segment_id TEXT NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL CHECK (char_end > char_start),
    quote TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_evidence_claim ON evidence_spans(claim_id);

CREATE TABLE IF NOT EXISTS people (
    person_id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(episode_id) ON DELETE CASCADE,
    display_name TEXT NOT NULL,
    role TEXT,
    mentions_json TEXT NOT NULL,
    description TEXT
);
CREATE INDEX IF NOT EXISTS idx_people_episode ON people(episode_id);

CREATE TABLE IF NOT EXISTS concepts (
    concept_id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(episode_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    definition TEXT NOT NULL,
    first_segment_id TEXT NOT NULL,
    supporting_evidence_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_concepts_episode ON concepts(episode_id);

CREATE TABLE IF NOT EXISTS jargon (
    jargon_id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(episode_id) ON DELETE CASCADE,
    term TEXT NOT NULL,
    definition TEXT NOT NULL,
    first_segment_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jargon_episode ON jargon(episode_id);

CREATE TABLE IF NOT EXISTS relations (
    relation_id TEXT PRIMARY KEY,
    from_claim TEXT NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    to_claim TEXT NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK (kind IN ('supports','contradicts','refines')),
    weight REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    job_type TEXT NOT NULL CHECK (job_type IN ('transcribe','mine','flagship','pipeline')),
    input_id TEXT NOT NULL,
    config_json TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('queued','running','succeeded','failed')),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jobs_input ON jobs(input_id);

CREATE TABLE IF NOT EXISTS job_runs (
    job_run_id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
    status TEXT NOT NULL CHECK (status IN ('queued','running','succeeded','failed')),
    started_at TEXT NOT NULL,
    completed_at TEXT,
    checkpoint_json TEXT NOT NULL,
    metrics_json TEXT NOT NULL,
    error_code TEXT,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_job_runs_job ON job_runs(job_id);

CREATE TABLE IF NOT EXISTS llm_requests (
    request_id TEXT PRIMARY KEY,
    job_run_id TEXT NOT NULL REFERENCES job_runs(job_run_id) ON DELETE CASCADE,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    temperature REAL NOT NULL,
    request_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_llm_requests_job_run ON llm_requests(job_run_id);

CREATE TABLE IF NOT EXISTS llm_responses (
    request_id TEXT PRIMARY KEY REFERENCES llm_requests(request_id) ON DELETE CASCADE,
    status_code INTEGER NOT NULL,
    completion_tokens INTEGER,
    prompt_tokens INTEGER,
    total_tokens INTEGER,
    latency_ms INTEGER NOT NULL,
    response_json TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS claims_fts USING fts5(
    claim_id UNINDEXED, canonical_text
);

CREATE VIRTUAL TABLE IF NOT EXISTS evidence_fts USING fts5(
    span_id UNINDEXED, quote
);
"#;

fn apply_migration_1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(MIGRATION_1)
}

/// Opens (creating if absent) the database at `path`, sets WAL mode and
/// foreign-key enforcement, and applies any migrations not yet recorded.
/// Refuses to proceed if the on-disk schema version exceeds what this build
/// knows how to read.
pub fn open_and_migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| StoreError::Database(e.to_string()))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| StoreError::Database(e.to_string()))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER NOT NULL);",
    )
    .map_err(|e| StoreError::Database(e.to_string()))?;

    let recorded: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

    if recorded > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchemaVersion {
            found: recorded,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if recorded < 1 {
        apply_migration_1(conn).map_err(|e| StoreError::Database(e.to_string()))?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_migrates_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        open_and_migrate(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn reopening_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        open_and_migrate(&conn).unwrap();
        open_and_migrate(&conn).unwrap();
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        open_and_migrate(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (999)", [])
            .unwrap();
        let err = open_and_migrate(&conn).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchemaVersion { .. }));
    }
}
