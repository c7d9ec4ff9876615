//! Demo CLI (feature `cli`): runs the pipeline over a job description read
//! from disk and prints the resulting article as JSON.
//!
//! Texture grounded on the pack's `clap`-derive CLIs (e.g.
//! `adaptive_pipeline_bootstrap::cli`): one subcommand per operation, a
//! `--verbose` flag wiring up `tracing-subscriber`, typed paths over raw
//! strings.

use std::path::PathBuf;
use std::sync::Arc;

use article_pipeline::config::PipelineConfig;
use article_pipeline::coordinator::Coordinator;
use article_pipeline::job::Job;
use article_pipeline::llm::LlmAdaptor;
use article_pipeline::progress::{ProgressBroadcaster, TracingProgressSink};
use article_pipeline::safety::SafetyTables;
use article_pipeline::store::{FileStateStore, StateStore};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "article-pipeline", about = "Run the article-generation pipeline over a job file")]
struct Cli {
    #[arg(long, global = true)]
    verbose: bool,

    /// Directory holding persisted job state, one JSON file per job code.
    #[arg(long, global = true, default_value = "./pipeline-state")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job from scratch.
    Process {
        /// Path to a JSON-encoded `Job`.
        job_file: PathBuf,
    },
    /// Resume a job, continuing from its last persisted stage.
    Resume {
        /// Path to a JSON-encoded `Job`.
        job_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("article_pipeline=debug,info").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let config = Arc::new(PipelineConfig::from_env());
    let tables = Arc::new(SafetyTables::default());
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(cli.state_dir));
    let adaptor = build_adaptor();

    let coordinator = Coordinator::new(adaptor, config, tables, store);

    let mut broadcaster = ProgressBroadcaster::new();
    broadcaster.add_sink(Arc::new(TracingProgressSink));

    let article = match cli.command {
        Command::Process { job_file } => {
            let job = load_job(&job_file)?;
            coordinator.process_job(job, &broadcaster, CancellationToken::new()).await?
        }
        Command::Resume { job_file } => {
            let job = load_job(&job_file)?;
            coordinator.resume(job, &broadcaster, CancellationToken::new()).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}

fn load_job(path: &PathBuf) -> anyhow::Result<Job> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(feature = "rig")]
fn build_adaptor() -> Arc<dyn LlmAdaptor> {
    Arc::new(article_pipeline::llm::rig_adaptor::RigLlmAdaptor::new())
}

#[cfg(not(feature = "rig"))]
fn build_adaptor() -> Arc<dyn LlmAdaptor> {
    Arc::new(article_pipeline::llm::FixtureLlmAdaptor::new())
}
