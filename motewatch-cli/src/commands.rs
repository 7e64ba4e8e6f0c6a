use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use motewatch_config::MotewatchConfig;
use motewatch_engine::{open_sink, run_compare_mode, run_replay_mode, run_simulation_mode};
use motewatch_telemetry::EventLogger;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "motewatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the seeded traffic simulator against the attack schedule
    Simulate(SimulateArgs),
    /// Feed a recorded run log through the observer
    Replay(ReplayArgs),
    /// Compare delivery and control traffic of a baseline run log and an attacked one
    Compare(CompareArgs),
    /// Load and validate the configuration, then print a summary
    CheckConfig(ConfigArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML configuration file; config/motewatch.yaml when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Number of packets to send, overriding simulator.event_count
    #[arg(long)]
    pub events: Option<usize>,
    /// Simulation seed, overriding simulator.seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fail and write a bug report unless the run produces this state hash
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Run log file, overriding output.log_path
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Recorded run log, one `<time>\tID:<node>\t<message>` line per event
    pub trace: PathBuf,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Run log file, overriding output.log_path
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Run log recorded without attacks
    pub baseline: PathBuf,
    /// Run log recorded under attack
    pub attacked: PathBuf,
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn load_config(args: &ConfigArgs) -> Result<MotewatchConfig, CliError> {
    Ok(match &args.config {
        Some(path) => MotewatchConfig::load_from_path(path)?,
        None => MotewatchConfig::load()?,
    })
}

pub async fn run_command(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
        Commands::Replay(args) => replay(args).await,
        Commands::Compare(args) => compare(&args),
        Commands::CheckConfig(args) => check_config(&args),
    }
}

async fn simulate(args: SimulateArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    if let Some(events) = args.events {
        config.simulator.event_count = events;
    }
    if let Some(seed) = args.seed {
        config.simulator.seed = seed;
    }
    if args.log.is_some() {
        config.output.log_path = args.log;
    }
    EventLogger::init(&config.telemetry.log_level);

    let sink = open_sink(&config)?;
    let (summary, _) =
        run_simulation_mode(&config, sink, args.validate_hash.as_deref()).await?;
    info!(
        hash = %summary.state_hash,
        events = summary.events_processed,
        timed_out = summary.timed_out,
        "simulation finished"
    );
    Ok(())
}

async fn replay(args: ReplayArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    if args.log.is_some() {
        config.output.log_path = args.log;
    }
    EventLogger::init(&config.telemetry.log_level);

    let sink = open_sink(&config)?;
    let (summary, _) = run_replay_mode(&config, Path::new(&args.trace), sink).await?;
    info!(
        hash = %summary.state_hash,
        events = summary.events_processed,
        "replay finished"
    );
    Ok(())
}

fn compare(args: &CompareArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    EventLogger::init(&config.telemetry.log_level);

    let comparison = run_compare_mode(&config, &args.baseline, &args.attacked)?;
    for line in comparison.lines() {
        println!("{line}");
    }
    Ok(())
}

fn check_config(args: &ConfigArgs) -> Result<(), CliError> {
    let config = load_config(args)?;
    println!("configuration ok");
    println!(
        "  network: {} nodes, server {}",
        config.network.node_count, config.network.server_id
    );
    for attack in &config.attacks {
        let steps = attack.program.as_ref().map_or(0, |p| p.steps.len());
        println!(
            "  attack {} on node {}: {}ms..{}ms, {} fault steps",
            attack.symbol, attack.target, attack.start_ms, attack.end_ms, steps
        );
    }
    Ok(())
}
