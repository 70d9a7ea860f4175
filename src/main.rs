use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use slurm_k8s_handoff::cluster::{client_from_kubeconfig, KubeClusterApi};
use slurm_k8s_handoff::controller::{
    Handoff, HandoffParams, ReadinessTarget, SchedulerTarget, TokioSleeper, WorkloadRequest,
};
use slurm_k8s_handoff::exec::ShellRunner;
use slurm_k8s_handoff::telemetry::{init_tracing, LogFormat};
use slurm_k8s_handoff::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hand a node over to Slurm or Kubernetes
    Run(RunArgs),
    /// Show version information
    Version,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Node to hand over
    #[arg(long, env = "NODE_NAME")]
    node: String,

    /// Scheduler to hand the node to (prompted for when omitted)
    #[arg(long, env = "HANDOFF_TARGET", value_enum)]
    target: Option<SchedulerTarget>,

    /// Namespace for the confirmation Job
    #[arg(long, env = "JOB_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Path to the kubeconfig used for all Kubernetes API calls
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Service that must have ready endpoints before submitting to Kubernetes
    #[arg(long, env = "READINESS_SERVICE", default_value = "kueue-webhook-service")]
    readiness_service: String,

    /// Namespace of the readiness service
    #[arg(long, env = "READINESS_NAMESPACE", default_value = "kueue-system")]
    readiness_namespace: String,

    /// Readiness polls before giving up
    #[arg(
        long,
        env = "MAX_ATTEMPTS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_attempts: u32,

    /// Seconds between readiness polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
    poll_interval_secs: u64,

    /// Kueue LocalQueue the confirmation Job is routed to
    #[arg(long, env = "QUEUE_NAME", default_value = "user-queue")]
    queue_name: String,

    /// Echo state-changing commands instead of running them and submit the
    /// Job with server-side dry run
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("Slurm-K8s Handoff v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Run(run_args) => {
            init_tracing(run_args.log_format);
            if let Err(e) = run_handoff(run_args).await {
                error!("Handoff failed: {}", e);
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_handoff(args: RunArgs) -> Result<(), Error> {
    info!(
        "Starting Slurm-K8s Handoff v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The cluster must be reachable before anything is drained
    let client = client_from_kubeconfig(args.kubeconfig.as_deref()).await?;
    info!("Kubernetes client configured");

    let target = match args.target {
        Some(target) => target,
        None => prompt_target().await?,
    };

    let runner = Arc::new(ShellRunner::new().with_dry_run(args.dry_run));
    let api = Arc::new(KubeClusterApi::new(client).with_dry_run(args.dry_run));

    let handoff = Handoff::new(runner, api, Arc::new(TokioSleeper))
        .with_poll_interval(Duration::from_secs(args.poll_interval_secs))
        .with_print_manifest(args.dry_run);

    let params = HandoffParams {
        readiness: ReadinessTarget::new(args.readiness_service, args.readiness_namespace),
        max_attempts: args.max_attempts,
        workload: WorkloadRequest {
            queue_name: args.queue_name,
            ..Default::default()
        },
        ..HandoffParams::new(args.node, args.namespace, target)
    };

    let report = handoff.run(&params).await?;
    info!("Submitted {}", report.job);
    println!("Resource allocation completed.");
    Ok(())
}

async fn prompt_target() -> Result<SchedulerTarget, Error> {
    let mut stdout = tokio::io::stdout();
    let prompt = b"Select the resource allocation method:\n1. Slurm\n2. k8s\nEnter 1 or 2: ";
    stdout
        .write_all(prompt)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to write prompt: {e}")))?;
    stdout
        .flush()
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to write prompt: {e}")))?;

    let mut choice = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut choice)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to read choice: {e}")))?;

    match choice.trim() {
        "1" => Ok(SchedulerTarget::BatchScheduler),
        "2" => Ok(SchedulerTarget::Orchestrator),
        other => Err(Error::ValidationError(format!("Invalid choice: {other}"))),
    }
}
