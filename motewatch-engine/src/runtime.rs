/*!
# Run Modes

Wires configuration into a complete run so every frontend shares one
implementation:

- **simulation**: the seeded traffic simulator is the event feed, and the
  attack schedule writes into the same mote images the simulator reads
- **replay**: a recorded run log is the event feed; attacks still run
  against in-process images
*/

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tracing::{error, info, instrument};

use motewatch_attacks::{AttackDescriptor, AttackScheduler, FaultProgram, FaultStep};
use motewatch_config::{AttackConfig, MotewatchConfig, NetworkConfig};
use motewatch_core::NodeId;
use motewatch_metrics::{Aggregator, MetricsSettings};
use motewatch_simulator::{
    provision_memory, SharedMemory, TraceReplayer, TrafficSettings, TrafficSimulator,
};
use motewatch_telemetry::{EventLogger, LineSink, MetricsRecorder, Sink};

use crate::compare::{compare_run_logs, RunComparison};
use crate::engine::{
    BugReport, DiagnosticsCollector, EngineError, EventFeed, Observer, ObserverSettings,
    ReplayDriver, RunSummary, SimulationDriver, SimulationRuntime,
};

pub fn metrics_settings(network: &NetworkConfig) -> MetricsSettings {
    MetricsSettings {
        node_count: network.node_count,
        payload_length_bytes: network.payload_length_bytes,
        clock_divisor: network.clock_divisor,
        time_scale: network.time_scale,
    }
}

pub fn attack_descriptor(attack: &AttackConfig) -> AttackDescriptor {
    let descriptor = AttackDescriptor::new(
        attack.symbol.clone(),
        NodeId::new(attack.target),
        attack.start_ms,
        attack.end_ms,
    );
    match &attack.program {
        Some(program) => descriptor.with_program(FaultProgram::new(
            program.symbol.clone(),
            program
                .steps
                .iter()
                .map(|step| FaultStep::at_ms(step.at_ms, step.value))
                .collect(),
        )),
        None => descriptor,
    }
}

pub fn build_scheduler(attacks: &[AttackConfig]) -> AttackScheduler {
    AttackScheduler::new(attacks.iter().map(attack_descriptor).collect())
}

/// The configured run log, or standard output.
pub fn open_sink(config: &MotewatchConfig) -> Result<Box<dyn Sink + Send>, EngineError> {
    Ok(match &config.output.log_path {
        Some(path) => Box::new(LineSink::create(path)?),
        None => Box::new(LineSink::stdout()),
    })
}

fn observer<S: Sink>(
    config: &MotewatchConfig,
    memory: SharedMemory,
    sink: S,
    metrics: Arc<MetricsRecorder>,
) -> Observer<S> {
    Observer::new(
        Aggregator::new(metrics_settings(&config.network)),
        build_scheduler(&config.attacks),
        memory,
        sink,
        metrics,
        ObserverSettings {
            report_every: config.output.report_every,
            echo_events: config.output.echo_events,
            parse_warnings: config.output.parse_warnings,
        },
    )
}

async fn drive<F: EventFeed, S: Sink>(
    config: &MotewatchConfig,
    driver: F,
    observer: Observer<S>,
    metrics: &MetricsRecorder,
) -> Result<(RunSummary, S), EngineError> {
    let runtime = SimulationRuntime::new(
        driver,
        config.core.event_bus.capacity,
        Duration::from_millis(config.run.timeout_ms),
    )?;
    let outcome = runtime.run(observer).await?;

    if let Some(path) = &config.output.metrics_path {
        std::fs::write(path, metrics.gather_metrics()?)?;
        info!(path = %path.display(), "metrics written");
    }
    Ok(outcome)
}

/// Runs the traffic simulator against the attack schedule.
///
/// With `validate_hash`, a differing state hash writes a bug report and fails
/// the run.
#[instrument(level = "info", name = "run_simulation_mode", skip_all, fields(seed = config.simulator.seed))]
pub async fn run_simulation_mode<S: Sink>(
    config: &MotewatchConfig,
    sink: S,
    validate_hash: Option<&str>,
) -> Result<(RunSummary, S), EngineError> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let memory = provision_memory(
        config.network.node_count,
        &config.attacks,
        config.simulator.symbol_size,
    )
    .into_shared();

    let simulator = TrafficSimulator::new(
        TrafficSettings::from_config(&config.network, &config.simulator, &config.run),
        memory.clone(),
    );
    let observer = observer(config, memory, sink, metrics.clone());
    let (summary, sink) = drive(config, SimulationDriver::new(simulator), observer, &metrics).await?;

    info!("Simulation complete. State hash: {}", summary.state_hash);
    if let Some(expected) = validate_hash {
        if !summary.state_hash.eq_ignore_ascii_case(expected) {
            error!(expected, actual = %summary.state_hash, "state hash mismatch");
            let mut diagnostics = DiagnosticsCollector::new(&config.run.diagnostics_dir);
            let report = diagnostics.record_bug_report(&BugReport {
                expected_hash: expected.to_string(),
                actual_hash: summary.state_hash.clone(),
                seed: config.simulator.seed,
                event_count: config.simulator.event_count,
                events_processed: summary.events_processed,
                timed_out: summary.timed_out,
                final_metrics: summary.final_metrics.final_line(),
            })?;
            return Err(EngineError::HashMismatch {
                expected: expected.to_string(),
                actual: summary.state_hash,
                report,
            });
        }
    }

    EventLogger::log_event(
        "simulation_complete",
        vec![
            KeyValue::new("event_count", config.simulator.event_count as i64),
            KeyValue::new("seed", config.simulator.seed.to_string()),
            KeyValue::new("final_hash", summary.state_hash.clone()),
        ],
    )
    .await;
    Ok((summary, sink))
}

/// Feeds a recorded run log through the observer.
#[instrument(level = "info", name = "run_replay_mode", skip(config, sink))]
pub async fn run_replay_mode<S: Sink>(
    config: &MotewatchConfig,
    trace: &Path,
    sink: S,
) -> Result<(RunSummary, S), EngineError> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let memory = provision_memory(
        config.network.node_count,
        &config.attacks,
        config.simulator.symbol_size,
    )
    .into_shared();

    let driver = ReplayDriver::new(TraceReplayer::open(trace)?);
    let observer = observer(config, memory, sink, metrics.clone());
    let (summary, sink) = drive(config, driver, observer, &metrics).await?;

    info!("Replay complete. State hash: {}", summary.state_hash);
    EventLogger::log_event(
        "replay_complete",
        vec![
            KeyValue::new("trace", trace.display().to_string()),
            KeyValue::new("final_hash", summary.state_hash.clone()),
        ],
    )
    .await;
    Ok((summary, sink))
}

/// Lines up a baseline run log against an attacked one.
#[instrument(level = "info", name = "run_compare_mode", skip(config))]
pub fn run_compare_mode(
    config: &MotewatchConfig,
    baseline: &Path,
    attacked: &Path,
) -> Result<RunComparison, EngineError> {
    let comparison = compare_run_logs(baseline, attacked, metrics_settings(&config.network))?;
    info!(
        nodes = comparison.nodes.len(),
        baseline_pdr = ?comparison.baseline.delivery_ratio_pct,
        attacked_pdr = ?comparison.attacked.delivery_ratio_pct,
        "comparison complete"
    );
    Ok(comparison)
}
