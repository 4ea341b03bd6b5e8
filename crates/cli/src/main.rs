//! `claw` binary: wires configuration, the store, the LLM adapter, and the
//! orchestrator together behind the CLI surface defined in `cli.rs`.

mod cli;

use std::fs;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use claw_config::{load_settings, JobConfig, Settings};
use claw_core::model::{EpisodeBundle, JobStatus, JobType, MediaSource};
use claw_evaluator::Evaluator;
use claw_governor::ResourceGovernor;
use claw_llm::{AdapterConfig, LlmAdapter};
use claw_miner::Miner;
use claw_orchestrator::Orchestrator;
use claw_store::{Store, StoreAuditSink};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.env.as_deref())?;
    settings.validate()?;
    init_tracing(&settings, cli.verbose);

    let store = Store::open(&settings.store.db_path)?;
    let governor = Arc::new(ResourceGovernor::detect(None, settings.max_workers_override));
    let audit = Arc::new(StoreAuditSink::new(store.clone()));
    let adapter = build_adapter(&settings, governor.clone(), audit);
    let miner = Arc::new(Miner::new(adapter.clone()));
    let evaluator = Arc::new(Evaluator::new(adapter));
    let orchestrator = Orchestrator::new(store.clone(), governor, miner, evaluator);

    match cli.command {
        Commands::Ingest { input, episode_id } => ingest(&store, &input, &episode_id)?,
        Commands::Run { job_type, episode_id, config } => {
            let job_type = parse_job_type(&job_type)?;
            let job_config = match config {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => JobConfig::default(),
            };
            let job_id = orchestrator.create_job(job_type, &episode_id, &job_config)?;
            let run = orchestrator.process_job(&job_id).await?;
            print_run(&job_id, &run);
        }
        Commands::Resume { job_id } => {
            let run = orchestrator.resume_job(&job_id).await?;
            print_run(&job_id, &run);
        }
        Commands::Cancel { job_id } => {
            if orchestrator.cancel_job(&job_id) {
                println!("cancellation requested for job {job_id}");
            } else {
                println!("job {job_id} is not currently running");
            }
        }
        Commands::Status { job_id } => {
            let job = store.get_job(&job_id)?;
            let run = store.latest_job_run(&job_id)?;
            println!("job {job_id}: status={:?}", job.status);
            if let Some(run) = run {
                print_run(&job_id, &run);
            }
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(settings.observability.log_level.clone())
    };

    let registry = tracing_subscriber::registry().with(filter);
    if settings.observability.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_adapter(settings: &Settings, governor: Arc<ResourceGovernor>, audit: Arc<StoreAuditSink>) -> Arc<LlmAdapter> {
    let config = AdapterConfig {
        ollama_base_url: settings.llm.ollama_base_url.clone(),
        openai_api_key: settings.llm.openai_api_key.clone(),
        anthropic_api_key: settings.llm.anthropic_api_key.clone(),
        max_retries: settings.llm.max_retries,
        ..AdapterConfig::default()
    };
    let audit: Arc<dyn claw_llm::AuditSink> = audit;
    Arc::new(LlmAdapter::new(config, governor, audit))
}

fn parse_job_type(s: &str) -> anyhow::Result<JobType> {
    match s {
        "transcribe" => Ok(JobType::Transcribe),
        "mine" => Ok(JobType::Mine),
        "flagship" => Ok(JobType::Flagship),
        "pipeline" => Ok(JobType::Pipeline),
        other => anyhow::bail!("unknown job type '{other}', expected one of transcribe|mine|flagship|pipeline"),
    }
}

fn ingest(store: &Arc<Store>, input_path: &str, episode_id: &str) -> anyhow::Result<()> {
    let raw = fs::read_to_string(input_path)?;
    let bundle: EpisodeBundle = serde_json::from_str(&raw)?;

    store.upsert_source(
        &bundle.source_id,
        &MediaSource {
            source_id: bundle.source_id.clone(),
            source_type: bundle.source_type,
            title: bundle.title.clone(),
            uploader: None,
            duration_s: bundle.duration_s,
            url: None,
            file_hash_sha256: None,
        },
    )?;
    store.upsert_episode(episode_id, &bundle.title, &bundle.language)?;
    store.replace_segments(episode_id, &bundle.segments)?;

    println!("ingested {} segments for episode {episode_id}", bundle.segments.len());
    Ok(())
}

fn print_run(job_id: &str, run: &claw_core::model::JobRun) {
    println!(
        "job {job_id} run {}: status={:?} metrics={}",
        run.job_run_id, run.status, run.metrics_json
    );
    if run.status == JobStatus::Failed {
        if let (Some(code), Some(message)) = (&run.error_code, &run.error_message) {
            println!("  error: [{code}] {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_job_type_accepts_the_four_stage_names() {
        assert!(matches!(parse_job_type("transcribe").unwrap(), JobType::Transcribe));
        assert!(matches!(parse_job_type("mine").unwrap(), JobType::Mine));
        assert!(matches!(parse_job_type("flagship").unwrap(), JobType::Flagship));
        assert!(matches!(parse_job_type("pipeline").unwrap(), JobType::Pipeline));
    }

    #[test]
    fn parse_job_type_rejects_unknown_names() {
        assert!(parse_job_type("transcode").is_err());
    }

    #[test]
    fn ingest_registers_source_episode_and_segments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("claw.db")).expect("open store");

        let bundle_json = serde_json::json!({
            "source_id": "doc_abc123",
            "source_type": "document",
            "title": "A Test Document",
            "language": "en",
            "duration_s": null,
            "segments": [
                {"segment_id": "seg-0", "start_s": 0.0, "end_s": 0.0, "speaker": null, "text": "hello world"}
            ]
        });
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{bundle_json}").expect("write bundle");

        ingest(&store, file.path().to_str().unwrap(), "ep-1").expect("ingest");

        let bundle = store.get_episode_bundle("ep-1").expect("get_episode_bundle");
        assert_eq!(bundle.title, "A Test Document");
        assert_eq!(bundle.segments.len(), 1);
        assert_eq!(bundle.segments[0].text, "hello world");
    }
}
