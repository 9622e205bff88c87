use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use palisade_config::{PalisadeConfig, ResolutionPolicy};
use palisade_engine::{
    render_summary, run_simulation_mode, run_sweep_mode, run_topology_mode, ReportFormat,
    SimulationOptions,
};
use palisade_telemetry::{EventLogger, MetricsRecorder};

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// YAML configuration file layered over the defaults
    /// (default: config/palisade.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one deterministic simulation and print its summary
    Simulate(SimulateArgs),
    /// Run consecutive seeds in parallel and compare their summaries
    Sweep(SweepArgs),
    /// Print node positions and neighbour sets
    Topology(TopologyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of sensing events to generate
    #[arg(long)]
    pub events: Option<u64>,
    /// await-timeout or first-confirmation
    #[arg(long)]
    pub policy: Option<ResolutionPolicy>,
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
    /// Fail (and write a bug report) unless the statistics digest matches
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Also print the final counters in Prometheus text format
    #[arg(long)]
    pub prometheus: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// First seed of the sweep (default: configured seed)
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, default_value_t = 8)]
    pub runs: u32,
    #[arg(long)]
    pub events: Option<u64>,
    #[arg(long)]
    pub policy: Option<ResolutionPolicy>,
}

#[derive(Args, Debug, Clone)]
pub struct TopologyArgs {
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

pub async fn run_command(cli: Cli) -> CommandResult {
    let config = PalisadeConfig::load_optional(cli.config.as_deref())?;
    EventLogger::init(&config.telemetry.log_level)?;
    let metrics = MetricsRecorder::new()?;

    match cli.command {
        Commands::Simulate(args) => simulate(config, args, metrics).await,
        Commands::Sweep(args) => sweep(config, args, metrics).await,
        Commands::Topology(args) => {
            println!("{}", run_topology_mode(&config, args.format)?);
            Ok(())
        }
    }
}

async fn simulate(
    mut config: PalisadeConfig,
    args: SimulateArgs,
    metrics: MetricsRecorder,
) -> CommandResult {
    apply_overrides(&mut config, args.seed, args.events, args.policy);
    info!(
        seed = config.simulation.seed,
        events = config.environment.total_events,
        policy = %config.detection.resolution_policy,
        "Running simulation"
    );

    let options = SimulationOptions {
        validate_hash: args.validate_hash,
        ..Default::default()
    };
    let summary = run_simulation_mode(config, &options, &metrics).await?;
    println!("{}", render_summary(&summary, args.format)?);
    if args.prometheus {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

async fn sweep(
    mut config: PalisadeConfig,
    args: SweepArgs,
    metrics: MetricsRecorder,
) -> CommandResult {
    apply_overrides(&mut config, None, args.events, args.policy);
    let base_seed = args.seed.unwrap_or(config.simulation.seed);
    let report = run_sweep_mode(config, base_seed, args.runs, &metrics).await?;
    println!("{report}");
    Ok(())
}

fn apply_overrides(
    config: &mut PalisadeConfig,
    seed: Option<u64>,
    events: Option<u64>,
    policy: Option<ResolutionPolicy>,
) {
    if let Some(seed) = seed {
        config.simulation.seed = seed;
    }
    if let Some(events) = events {
        config.environment.total_events = events;
    }
    if let Some(policy) = policy {
        config.detection.resolution_policy = policy;
    }
}
