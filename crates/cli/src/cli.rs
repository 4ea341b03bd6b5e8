//! CLI definition (spec §8 "CLI surface"): `ingest`, `run`, `resume`,
//! `cancel`, and `status` over the claw pipeline.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "claw")]
#[command(author, version, about = "Claim extraction and content analysis pipeline", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration environment name (loads `config/{env}.toml`)
    #[arg(long, global = true)]
    pub env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register an episode bundle (source, episode, segments) from a JSON file
    Ingest {
        /// Path to a JSON-encoded `EpisodeBundle`
        #[arg(short, long)]
        input: String,
        /// Episode id to store the bundle under
        #[arg(long)]
        episode_id: String,
    },

    /// Create and run a job end-to-end
    Run {
        /// `mine`, `flagship`, `transcribe`, or `pipeline`
        #[arg(long, default_value = "pipeline")]
        job_type: String,
        /// Episode id this job operates on
        #[arg(long)]
        episode_id: String,
        /// Path to a JSON-encoded `JobConfig` override (uses defaults if omitted)
        #[arg(long)]
        config: Option<String>,
    },

    /// Resume a job from its last checkpoint
    Resume {
        #[arg(long)]
        job_id: String,
    },

    /// Request cooperative cancellation of a running job
    Cancel {
        #[arg(long)]
        job_id: String,
    },

    /// Print a job's current status and latest run metrics
    Status {
        #[arg(long)]
        job_id: String,
    },
}
