//! Job lifecycle state machine: `create_job`, `process_job`, `resume_job`,
//! `cancel_job`, stage chaining for `pipeline` jobs, and metrics aggregation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use claw_config::{JobConfig, RoutingPolicy, Stage};
use claw_core::model::{Job, JobRun, JobStatus, JobType};
use claw_evaluator::{Evaluator, EvaluatorContext};
use claw_governor::ResourceGovernor;
use claw_llm::ModelUri;
use claw_miner::Miner;
use claw_pipeline::{run_episode_pipeline, EpisodePipelineConfig, MiningStageConfig};
use claw_store::Store;

use crate::registry::CancelRegistry;
use crate::OrchestratorError;

pub struct Orchestrator {
    store: Arc<Store>,
    governor: Arc<ResourceGovernor>,
    miner: Arc<Miner>,
    evaluator: Arc<Evaluator>,
    job_semaphore: Arc<Semaphore>,
    cancels: CancelRegistry,
}

impl Orchestrator {
    pub fn new(store: Arc<Store>, governor: Arc<ResourceGovernor>, miner: Arc<Miner>, evaluator: Arc<Evaluator>) -> Self {
        let max_concurrent_jobs = governor.worker_count().max(1);
        Self {
            store,
            governor,
            miner,
            evaluator,
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            cancels: CancelRegistry::new(),
        }
    }

    #[instrument(skip(self, config))]
    pub fn create_job(&self, job_type: JobType, input_id: &str, config: &JobConfig) -> Result<String, OrchestratorError> {
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            job_id: job_id.clone(),
            job_type,
            input_id: input_id.to_string(),
            config_json: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
            status: JobStatus::Queued,
            created_at: Utc::now(),
        };
        self.store.create_job(&job)?;
        Ok(job_id)
    }

    /// Transitions `queued -> running`, opens a fresh `JobRun`, dispatches to
    /// the stage handler for the job's type, and persists the terminal state.
    #[instrument(skip(self))]
    pub async fn process_job(&self, job_id: &str) -> Result<JobRun, OrchestratorError> {
        let _permit = self.job_semaphore.acquire().await.expect("semaphore is never closed");
        self.run_job(job_id, &HashSet::new()).await
    }

    /// Loads the latest checkpoint and resumes from it, skipping segments
    /// the checkpoint already accounted for.
    #[instrument(skip(self))]
    pub async fn resume_job(&self, job_id: &str) -> Result<JobRun, OrchestratorError> {
        let _permit = self.job_semaphore.acquire().await.expect("semaphore is never closed");
        let already_done = self
            .store
            .latest_job_run(job_id)?
            .and_then(|run| run.checkpoint_json.get("done_segment_ids").cloned())
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .map(|v| v.into_iter().collect())
            .unwrap_or_default();
        self.run_job(job_id, &already_done).await
    }

    /// Sets the cooperative cancellation flag observed by the Pipeline
    /// Driver and LLM Adapter. Returns `true` if a running job was found.
    pub fn cancel_job(&self, job_id: &str) -> bool {
        self.cancels.cancel(job_id)
    }

    async fn run_job(&self, job_id: &str, already_done: &HashSet<String>) -> Result<JobRun, OrchestratorError> {
        let job = self.store.get_job(job_id)?;
        self.store.update_job_status(job_id, JobStatus::Running)?;

        let job_run_id = Uuid::new_v4().to_string();
        let run = JobRun {
            job_run_id: job_run_id.clone(),
            job_id: job_id.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            checkpoint_json: serde_json::Value::Null,
            metrics_json: serde_json::Value::Null,
            error_code: None,
            error_message: None,
        };
        self.store.create_job_run(&run)?;

        let cancel = self.cancels.register(job_id);
        let config: JobConfig = serde_json::from_value(job.config_json.clone()).unwrap_or_default();

        let result = match job.job_type {
            JobType::Pipeline => self.run_stages(&job_run_id, &job, &config, already_done, cancel.clone()).await,
            JobType::Mine | JobType::Flagship => {
                self.run_mine_stage(&job_run_id, &job.input_id, &config, already_done, cancel.clone(), job.job_type == JobType::Flagship).await
            }
            JobType::Transcribe => self.run_transcribe_stage(&job.input_id),
        };

        self.cancels.remove(job_id);

        let failure = match &result {
            Ok(_) => None,
            Err(_) if cancel.is_cancelled() => Some(("CANCELLED".to_string(), "job cancelled".to_string())),
            Err(err) => Some((err.error_code().to_string(), err.to_string())),
        };

        match &failure {
            None => {
                let metrics = result.as_ref().expect("checked Ok above");
                self.store.update_job_status(job_id, JobStatus::Succeeded)?;
                self.store.complete_job_run(&job_run_id, JobStatus::Succeeded, metrics, None, None)?;
            }
            Some((code, message)) => {
                warn!(job_id, error_code = %code, "job failed");
                self.store.update_job_status(job_id, JobStatus::Failed)?;
                self.store.complete_job_run(
                    &job_run_id,
                    JobStatus::Failed,
                    &serde_json::Value::Null,
                    Some(code.as_str()),
                    Some(message.as_str()),
                )?;
            }
        }

        result?;
        self.store
            .latest_job_run(job_id)?
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.to_string()))
    }

    /// Runs `config.stages` sequentially, each as its own sub-job. A stage
    /// only begins once the upstream stage's run reached `succeeded`.
    async fn run_stages(
        &self,
        job_run_id: &str,
        job: &Job,
        config: &JobConfig,
        already_done: &HashSet<String>,
        cancel: claw_llm::CancelToken,
    ) -> Result<serde_json::Value, OrchestratorError> {
        let mut last_metrics = serde_json::Value::Null;
        for stage in &config.stages {
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Pipeline(claw_pipeline::PipelineError::Cancelled));
            }
            last_metrics = match stage {
                Stage::Transcribe => self.run_transcribe_stage(&job.input_id)?,
                Stage::Mine => {
                    self.run_mine_stage(job_run_id, &job.input_id, config, already_done, cancel.clone(), false).await?
                }
                Stage::Flagship => {
                    self.run_mine_stage(job_run_id, &job.input_id, config, &HashSet::new(), cancel.clone(), true).await?
                }
            };
            info!(job_id = %job.job_id, stage = ?stage, "stage completed");
        }
        Ok(last_metrics)
    }

    fn run_transcribe_stage(&self, episode_id: &str) -> Result<serde_json::Value, OrchestratorError> {
        // Speech-to-text is out of scope; this stage only confirms an
        // episode bundle already exists for `episode_id`.
        let bundle = self.store.get_episode_bundle(episode_id)?;
        Ok(serde_json::json!({ "stage": "transcribe", "segment_count": bundle.segments.len() }))
    }

    /// Runs the mining + evaluation pass for one episode. `force_flagship`
    /// overrides the job's routing policy to `Flagship` for every entity
    /// kind, modeling the `flagship` stage as a stronger, fully re-mined
    /// second pass rather than a partial re-score of persisted entities.
    async fn run_mine_stage(
        &self,
        job_run_id: &str,
        episode_id: &str,
        config: &JobConfig,
        already_done: &HashSet<String>,
        cancel: claw_llm::CancelToken,
        force_flagship: bool,
    ) -> Result<serde_json::Value, OrchestratorError> {
        let bundle = self.store.get_episode_bundle(episode_id)?;

        let miner_model: ModelUri = config
            .miner_model
            .as_deref()
            .unwrap_or("ollama:llama3.1:8b")
            .parse()
            .map_err(|_| OrchestratorError::Store(claw_store::StoreError::Integrity("invalid miner_model".to_string())))?;
        let lightweight_model: ModelUri = config
            .lightweight_model
            .as_deref()
            .unwrap_or("openai:gpt-4o-mini")
            .parse()
            .map_err(|_| OrchestratorError::Store(claw_store::StoreError::Integrity("invalid lightweight_model".to_string())))?;
        let flagship_model: ModelUri = config
            .flagship_model
            .as_deref()
            .unwrap_or("openai:gpt-4o")
            .parse()
            .map_err(|_| OrchestratorError::Store(claw_store::StoreError::Integrity("invalid flagship_model".to_string())))?;

        let mut job_config = config.clone();
        if force_flagship {
            for kind in ["claims", "people", "concepts", "jargon"] {
                job_config.routing_policy.insert(kind.to_string(), RoutingPolicy::Flagship);
            }
        }

        let store = self.store.clone();
        let job_run_id_owned = job_run_id.to_string();
        let pipeline_config = EpisodePipelineConfig {
            mining: MiningStageConfig {
                episode_title: bundle.title.clone(),
                model: miner_model,
                temperature: config.temperature,
                request_timeout_s: config.request_timeout_s,
                checkpoint_every: config.checkpoint_every as usize,
            },
            evaluator: EvaluatorContext {
                job_run_id: job_run_id.to_string(),
                episode_title: bundle.title.clone(),
                lightweight_model,
                flagship_model,
                uncertainty_band: config.uncertainty_band,
                batch_size: config.evaluator_batch_size as usize,
                temperature: config.temperature,
                request_timeout_s: config.request_timeout_s,
            },
            job_config,
        };

        let outputs = run_episode_pipeline(
            store.clone(),
            self.miner.clone(),
            self.evaluator.clone(),
            self.governor.clone(),
            job_run_id,
            episode_id,
            &bundle,
            already_done,
            pipeline_config,
            cancel,
            move |checkpoint| {
                let checkpoint_json = serde_json::json!({
                    "stage": "mine",
                    "last_segment": checkpoint.last_completed_index,
                    "partial_results": {
                        "claims": checkpoint.claims_so_far,
                        "people": checkpoint.people_so_far,
                        "jargon": checkpoint.jargon_so_far,
                        "concepts": checkpoint.concepts_so_far,
                    },
                    "done_segment_ids": checkpoint.done_segment_ids,
                });
                if let Err(err) = store.update_job_run_checkpoint(&job_run_id_owned, &checkpoint_json) {
                    warn!(error = %err, "failed to persist checkpoint");
                }
            },
        )
        .await?;

        Ok(serde_json::json!({
            "claims": outputs.claims.len(),
            "people": outputs.people.len(),
            "concepts": outputs.concepts.len(),
            "jargon": outputs.jargon.len(),
            "worker_count": self.governor.worker_count(),
        }))
    }
}
