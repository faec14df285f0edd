//! # Batch Runner
//!
//! Command-line entry point for the bundled sample jobs. Runs one job to
//! completion, or drives the configured triggers until they run out or the
//! process receives Ctrl-C.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tasker_batch::config::{ConfigManager, ScheduledTriggerConfig};
use tasker_batch::constants::jobs;
use tasker_batch::logging::init_structured_logging;
use tasker_batch::samples::sample_jobs;
use tasker_batch::scheduler::OverlapPolicy;
use tasker_batch::utils::{RandomSource, SeededRandomSource, StdRandomSource};
use tasker_batch::{BatchStatus, InMemoryJobRepository, JobLauncher, JobParameters, JobScheduler};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "batch-runner")]
#[command(about = "Run and schedule the bundled batch jobs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory (default: ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Seed for chunk sizing and random deciders
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch one job and print the final execution as JSON
    Run {
        /// Job name (see `list`)
        job: String,

        /// Parameters as key=value or key(type)=value
        params: Vec<String>,
    },

    /// Fire jobs on fixed-interval triggers
    Schedule {
        /// Schedule this job instead of the configured triggers
        #[arg(long)]
        job: Option<String>,

        /// Seconds between fires
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Fires after the first one (0 = until Ctrl-C)
        #[arg(long, default_value_t = 4)]
        repeat: u64,

        /// Base parameters as key=value or key(type)=value
        params: Vec<String>,
    },

    /// List the available jobs
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_structured_logging();

    let manager = ConfigManager::load_from_directory(cli.config_dir.clone())
        .context("failed to load batch configuration")?;
    let config = manager.config().clone();
    info!(environment = %manager.environment(), "Configuration loaded");

    let random: Arc<dyn RandomSource> = match cli.seed {
        Some(seed) => Arc::new(SeededRandomSource::new(seed)),
        None => Arc::new(StdRandomSource::new()),
    };
    let registry = sample_jobs(random, &config.execution)?;
    let launcher = Arc::new(JobLauncher::from_config(
        Arc::new(InMemoryJobRepository::new()),
        &config,
    ));

    match cli.command {
        Commands::Run { job, params } => {
            let Some(job) = registry.get(&job) else {
                bail!("unknown job '{job}'; available: {}", jobs::ALL.join(", "));
            };
            let parameters = JobParameters::from_args(&params)?;
            let (_, handle) = launcher.launch_with_handle(Arc::clone(job), parameters).await?;
            let execution = handle.await.context("job worker did not finish")?;

            println!("{}", serde_json::to_string_pretty(&execution)?);
            if execution.status == BatchStatus::Completed {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Schedule {
            job,
            interval,
            repeat,
            params,
        } => {
            let triggers = match job {
                Some(job_name) => vec![ScheduledTriggerConfig {
                    job_name,
                    name: "cli".to_string(),
                    interval_seconds: interval,
                    repeat_count: repeat,
                    overlap_policy: OverlapPolicy::Skip,
                    parameters: parse_pairs(&params)?,
                }],
                None => config.scheduler.triggers.clone(),
            };
            if triggers.is_empty() {
                bail!("no triggers configured; pass --job or add scheduler.triggers to batch.yaml");
            }

            let scheduler = JobScheduler::from_config(Arc::clone(&launcher), &config.scheduler);
            let handles = scheduler.schedule_all(&registry, &triggers)?;

            let all_finished = futures::future::join_all(handles.iter().map(|handle| handle.wait()));
            tokio::select! {
                _ = all_finished => info!("All triggers finished"),
                _ = tokio::signal::ctrl_c() => warn!("Interrupted; shutting down scheduler"),
            }
            scheduler.shutdown().await?;

            for handle in &handles {
                let stats = handle.stats();
                println!(
                    "{} [{}]: ticks={} dispatched={} skipped={}",
                    handle.job_name(),
                    handle.trigger_name(),
                    stats.ticks,
                    stats.dispatched,
                    stats.skipped
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::List => {
            for name in jobs::ALL {
                if let Some(job) = registry.get(name) {
                    let nodes: Vec<&str> = job.flow().node_names().collect();
                    println!("{name}: {}", nodes.join(", "));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Split `key=value` arguments for a trigger's base parameters
fn parse_pairs(params: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    params
        .iter()
        .map(|param| match param.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => bail!("parameter '{param}' is not in key=value form"),
        })
        .collect()
}
