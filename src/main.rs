//! atjob - One-shot scheduled-job control plane.
//!
//! Main entry point: wires the in-process store, dispatcher and executor
//! together, submits a job and follows it to completion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atjob_api::{AtJob, JobSpec, Phase, ResourceKey};
use atjob_controller::{workload_key, ReconcileContext, SCHEDULE_FORMAT};
use atjob_runtime::{Dispatcher, Executor, RuntimeConfig};
use atjob_store::{LogRecorder, MemoryStore, RefLinker, ResourceStore};

/// atjob CLI.
#[derive(Parser)]
#[command(name = "atjob")]
#[command(about = "One-shot scheduled-job control plane")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job against an in-process control plane and follow it
    Run {
        /// Scheduled UTC instant, format YYYY-MM-DDTHH:MM:SSZ
        #[arg(long)]
        schedule: String,

        /// Command line, whitespace-delimited tokens (no quoting)
        #[arg(long)]
        command: String,

        /// Job namespace
        #[arg(long, default_value = "default")]
        namespace: String,

        /// Job name
        #[arg(long, default_value = "job")]
        name: String,
    },

    /// Run a canned example: echo a greeting two seconds from now
    Demo,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run {
            schedule,
            command,
            namespace,
            name,
        } => {
            run_job(
                config,
                AtJob::new(namespace, name, JobSpec { schedule, command }),
            )
            .await
        }
        Commands::Demo => {
            let schedule = (Utc::now() + TimeDelta::seconds(2))
                .format(SCHEDULE_FORMAT)
                .to_string();
            run_job(
                config,
                AtJob::new(
                    "default",
                    "demo",
                    JobSpec {
                        schedule,
                        command: "echo hello from atjob".to_string(),
                    },
                ),
            )
            .await
        }
    }
}

async fn run_job(config: RuntimeConfig, job: AtJob) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let ctx = ReconcileContext::new(
        store.clone(),
        Arc::new(LogRecorder::new()),
        Arc::new(RefLinker::new()),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let dispatcher = tokio::spawn(
        Dispatcher::new(config.dispatcher.clone(), ctx).run(shutdown_tx.subscribe()),
    );
    let executor = tokio::spawn(
        Executor::new(config.executor.clone(), store.clone()).run(shutdown_tx.subscribe()),
    );

    let created = store.create_job(&job).await?;
    let key = created.key();
    info!(job = %key, schedule = %created.spec.schedule, "job submitted");

    follow(store.as_ref(), &key).await?;

    let _ = shutdown_tx.send(());
    let _ = dispatcher.await;
    let _ = executor.await;
    Ok(())
}

/// Follow a job through its phases until it is Done.
async fn follow(store: &MemoryStore, key: &ResourceKey) -> anyhow::Result<()> {
    let mut watch = store.watch();
    let mut last = None;

    loop {
        let job = store.get_job(key).await?;
        if last != Some(job.phase()) {
            info!(job = %key, phase = %job.phase(), "phase");
            last = Some(job.phase());
        }
        if job.phase() == Phase::Done {
            match store.get_workload(&workload_key(&job)).await {
                Ok(workload) => {
                    info!(job = %key, outcome = ?workload.phase(), "job complete")
                }
                Err(e) => warn!(job = %key, "job complete, workload gone: {e}"),
            }
            return Ok(());
        }

        // Wake on any store change; the periodic timeout only guards
        // against a missed notification.
        match tokio::time::timeout(Duration::from_secs(30), watch.recv()).await {
            Ok(Ok(_)) | Err(_) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                anyhow::bail!("store watch closed while following {key}");
            }
        }
    }
}
