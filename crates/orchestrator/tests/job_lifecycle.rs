//! Exercises the job lifecycle surface that doesn't require a reachable LLM
//! provider: creation, status persistence, and cooperative cancellation.
//! (`process_job`/`resume_job` themselves call out to `claw-miner`, so they
//! are left to manual/live-provider verification rather than unit coverage
//! that would otherwise depend on network access.)

use std::sync::Arc;

use claw_config::JobConfig;
use claw_core::model::{JobStatus, JobType};
use claw_evaluator::Evaluator;
use claw_governor::ResourceGovernor;
use claw_llm::{AdapterConfig, LlmAdapter, NoopAuditSink};
use claw_miner::Miner;
use claw_orchestrator::Orchestrator;
use claw_store::Store;

fn test_orchestrator() -> (tempfile::TempDir, Orchestrator) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("claw.db")).expect("open store");
    let governor = Arc::new(ResourceGovernor::detect(None, Some(2)));
    let audit: Arc<dyn claw_llm::AuditSink> = Arc::new(NoopAuditSink);
    let adapter = Arc::new(LlmAdapter::new(AdapterConfig::default(), governor.clone(), audit));
    let miner = Arc::new(Miner::new(adapter.clone()));
    let evaluator = Arc::new(Evaluator::new(adapter));
    (dir, Orchestrator::new(store, governor, miner, evaluator))
}

#[test]
fn create_job_persists_a_queued_job() {
    let (_dir, orchestrator) = test_orchestrator();
    let job_id = orchestrator
        .create_job(JobType::Mine, "ep-1", &JobConfig::default())
        .expect("create_job");
    assert!(!job_id.is_empty());
}

#[test]
fn cancelling_a_job_that_never_started_is_a_no_op() {
    let (_dir, orchestrator) = test_orchestrator();
    let job_id = orchestrator
        .create_job(JobType::Pipeline, "ep-2", &JobConfig::default())
        .expect("create_job");
    // The job was created but never dispatched through `process_job`, so no
    // cancel token has been registered for it yet.
    assert!(!orchestrator.cancel_job(&job_id));
}

#[test]
fn job_status_transitions_reject_skipping_running() {
    assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
    assert!(!JobStatus::Queued.can_transition_to(JobStatus::Succeeded));
}
