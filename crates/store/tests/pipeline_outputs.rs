//! Black-box exercise of the store's episode/job surface end-to-end,
//! through the same `Store::open` path the CLI uses (no `cfg(test)` shortcuts).

use chrono::Utc;
use claw_core::model::{
    Claim, Job, JobRun, JobStatus, JobType, JargonTerm, MediaSource, Segment, SourceType, Tier,
};
use claw_store::{PipelineOutputs, Store};

fn temp_store() -> (tempfile::TempDir, std::sync::Arc<Store>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("claw.db")).expect("open store");
    (dir, store)
}

fn seed_episode(store: &Store, episode_id: &str) {
    store
        .upsert_source(
            episode_id,
            &MediaSource {
                source_id: episode_id.to_string(),
                source_type: SourceType::Document,
                title: "A Test Episode".to_string(),
                uploader: None,
                duration_s: None,
                url: None,
                file_hash_sha256: None,
            },
        )
        .expect("upsert_source");
    store.upsert_episode(episode_id, "A Test Episode", "en").expect("upsert_episode");
    store
        .replace_segments(
            episode_id,
            &[
                Segment {
                    segment_id: "seg-0".to_string(),
                    episode_id: episode_id.to_string(),
                    start_s: 0.0,
                    end_s: 10.0,
                    speaker: None,
                    text: "Rust ownership prevents data races at compile time.".to_string(),
                },
                Segment {
                    segment_id: "seg-1".to_string(),
                    episode_id: episode_id.to_string(),
                    start_s: 10.0,
                    end_s: 20.0,
                    speaker: None,
                    text: "The borrow checker enforces this invariant.".to_string(),
                },
            ],
        )
        .expect("replace_segments");
}

#[test]
fn replace_segments_rejects_overlapping_windows() {
    let (_dir, store) = temp_store();
    seed_episode(&store, "ep-overlap");
    let err = store
        .replace_segments(
            "ep-overlap",
            &[
                Segment {
                    segment_id: "a".to_string(),
                    episode_id: "ep-overlap".to_string(),
                    start_s: 0.0,
                    end_s: 10.0,
                    speaker: None,
                    text: "a".to_string(),
                },
                Segment {
                    segment_id: "b".to_string(),
                    episode_id: "ep-overlap".to_string(),
                    start_s: 5.0,
                    end_s: 15.0,
                    speaker: None,
                    text: "b".to_string(),
                },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, claw_store::StoreError::Integrity(_)));
}

#[test]
fn upsert_pipeline_outputs_replaces_prior_pass_and_rebuilds_fts() {
    let (_dir, store) = temp_store();
    seed_episode(&store, "ep-1");

    let first_pass = PipelineOutputs {
        claims: vec![(
            Claim {
                claim_id: "claim-1".to_string(),
                episode_id: "ep-1".to_string(),
                segment_id: "seg-0".to_string(),
                canonical_text: "ownership prevents data races".to_string(),
                raw_text: "ownership prevents data races".to_string(),
                tier: Tier::B,
                scoring_json: serde_json::json!({"score": 0.6}),
                created_at: Utc::now(),
            },
            vec![],
        )],
        people: vec![],
        concepts: vec![],
        jargon: vec![JargonTerm {
            jargon_id: "jargon-1".to_string(),
            episode_id: "ep-1".to_string(),
            term: "borrow checker".to_string(),
            definition: "Static analysis enforcing Rust's aliasing rules.".to_string(),
            first_segment_id: "seg-1".to_string(),
        }],
    };
    store.upsert_pipeline_outputs("ep-1", &first_pass).expect("first upsert");

    let found = store.search_claims("ownership", Some("ep-1")).expect("search");
    assert_eq!(found, vec!["claim-1".to_string()]);

    let by_tier = store.get_claims_by_tier("ep-1", Tier::B).expect("get_claims_by_tier");
    assert_eq!(by_tier.len(), 1);
    assert_eq!(by_tier[0].claim_id, "claim-1");

    // A second pass with a higher tier and different text replaces the first
    // entirely rather than merging with it.
    let second_pass = PipelineOutputs {
        claims: vec![(
            Claim {
                claim_id: "claim-2".to_string(),
                episode_id: "ep-1".to_string(),
                segment_id: "seg-0".to_string(),
                canonical_text: "the borrow checker enforces aliasing rules".to_string(),
                raw_text: "the borrow checker enforces aliasing rules".to_string(),
                tier: Tier::A,
                scoring_json: serde_json::json!({"score": 0.9}),
                created_at: Utc::now(),
            },
            vec![],
        )],
        people: vec![],
        concepts: vec![],
        jargon: vec![],
    };
    store.upsert_pipeline_outputs("ep-1", &second_pass).expect("second upsert");

    assert!(store.search_claims("ownership", Some("ep-1")).expect("search").is_empty());
    let by_tier = store.get_claims_by_tier("ep-1", Tier::A).expect("get_claims_by_tier");
    assert_eq!(by_tier.len(), 1);
    assert_eq!(by_tier[0].claim_id, "claim-2");
}

#[test]
fn get_episode_bundle_returns_segments_in_start_order() {
    let (_dir, store) = temp_store();
    seed_episode(&store, "ep-2");
    let bundle = store.get_episode_bundle("ep-2").expect("bundle");
    assert_eq!(bundle.segments.len(), 2);
    assert_eq!(bundle.segments[0].segment_id, "seg-0");
    assert_eq!(bundle.segments[1].segment_id, "seg-1");
}

#[test]
fn unknown_episode_fails_with_not_found() {
    let (_dir, store) = temp_store();
    let err = store.get_episode_bundle("does-not-exist").unwrap_err();
    assert!(matches!(err, claw_store::StoreError::NotFound(_)));
}

#[test]
fn job_lifecycle_round_trips_through_the_store() {
    let (_dir, store) = temp_store();
    let job = Job {
        job_id: "job-1".to_string(),
        job_type: JobType::Mine,
        input_id: "ep-3".to_string(),
        config_json: serde_json::json!({"stages": ["mine"]}),
        status: JobStatus::Queued,
        created_at: Utc::now(),
    };
    store.create_job(&job).expect("create_job");
    store.update_job_status("job-1", JobStatus::Running).expect("queued->running");

    let run = JobRun {
        job_run_id: "run-1".to_string(),
        job_id: "job-1".to_string(),
        status: JobStatus::Running,
        started_at: Utc::now(),
        completed_at: None,
        checkpoint_json: serde_json::Value::Null,
        metrics_json: serde_json::Value::Null,
        error_code: None,
        error_message: None,
    };
    store.create_job_run(&run).expect("create_job_run");
    store
        .update_job_run_checkpoint("run-1", &serde_json::json!({"done_segment_ids": ["seg-0"]}))
        .expect("checkpoint");
    store
        .complete_job_run("run-1", JobStatus::Succeeded, &serde_json::json!({"claims": 1}), None, None)
        .expect("complete_job_run");
    store.update_job_status("job-1", JobStatus::Succeeded).expect("running->succeeded");

    let loaded = store.get_job("job-1").expect("get_job");
    assert_eq!(loaded.status, JobStatus::Succeeded);

    let latest = store.latest_job_run("job-1").expect("latest_job_run").expect("a run exists");
    assert_eq!(latest.status, JobStatus::Succeeded);
    assert_eq!(
        latest.checkpoint_json.get("done_segment_ids").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );
}
