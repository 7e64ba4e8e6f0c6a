//! The single consumer of the event feed.
//!
//! Each log event goes through the parser and the aggregator, then the
//! attack scheduler is ticked at the event's time. Clock ticks only tick the
//! scheduler. Everything worth keeping ends up as a sink line.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{debug, info, warn};

use motewatch_attacks::{AttackEvent, AttackScheduler};
use motewatch_core::events::SimEvent;
use motewatch_metrics::{AggregateMetrics, Aggregator, MetricValue};
use motewatch_protocols::{CoojaLogParser, MoteEvent};
use motewatch_simulator::SharedMemory;
use motewatch_telemetry::{EventLogger, MetricsRecorder, Sink};

use crate::engine::{EngineError, HashingSink};

#[derive(Debug, Clone, Copy)]
pub struct ObserverSettings {
    /// Aggregate report every N receive events.
    pub report_every: u64,
    pub echo_events: bool,
    pub parse_warnings: bool,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            report_every: 1,
            echo_events: false,
            parse_warnings: false,
        }
    }
}

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub final_metrics: AggregateMetrics,
    pub state_hash: String,
    pub events_processed: u64,
    pub lines_written: u64,
    pub timed_out: bool,
    pub attacks_finished: bool,
}

pub struct Observer<S> {
    parser: CoojaLogParser,
    aggregator: Aggregator,
    scheduler: AttackScheduler,
    memory: SharedMemory,
    sink: HashingSink<S>,
    metrics: Arc<MetricsRecorder>,
    settings: ObserverSettings,
    receives_since_report: u64,
    events_processed: u64,
    last_time: u64,
}

impl<S: Sink> Observer<S> {
    pub fn new(
        aggregator: Aggregator,
        scheduler: AttackScheduler,
        memory: SharedMemory,
        sink: S,
        metrics: Arc<MetricsRecorder>,
        settings: ObserverSettings,
    ) -> Self {
        Self {
            parser: CoojaLogParser::new(),
            aggregator,
            scheduler,
            memory,
            sink: HashingSink::new(sink),
            metrics,
            settings,
            receives_since_report: 0,
            events_processed: 0,
            last_time: 0,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn scheduler(&self) -> &AttackScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        self.sink.inner()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub async fn process(&mut self, event: &SimEvent) -> Result<(), EngineError> {
        self.events_processed += 1;
        self.metrics.inc_processed_events();
        let now = event.timestamp();
        self.last_time = self.last_time.max(now);

        if let SimEvent::Log {
            timestamp,
            origin,
            payload,
        } = event
        {
            if self.settings.echo_events {
                self.sink
                    .append(*timestamp, Some(*origin), &String::from_utf8_lossy(payload))?;
            }
            self.observe_log(payload, *origin, *timestamp)?;
        }

        self.tick_attacks(now).await
    }

    fn observe_log(&mut self, payload: &[u8], origin: i64, timestamp: u64) -> Result<(), EngineError> {
        let parsed = self.parser.classify(payload, origin, timestamp);
        if let MoteEvent::Ignored { reason } = &parsed {
            self.metrics.ignored_events.inc();
            debug!(origin, timestamp, %reason, "log line ignored");
            if self.settings.parse_warnings {
                self.sink.append(
                    timestamp,
                    Some(origin),
                    &format!("[WARN: motewatch ] unparsed line: {reason}"),
                )?;
            }
            return Ok(());
        }

        match self.aggregator.apply(&parsed) {
            Ok(Some(aggregate)) => {
                self.metrics
                    .record_ratios(aggregate.reception_rate, aggregate.delivery_ratio_pct);
                self.receives_since_report += 1;
                if self.receives_since_report >= self.settings.report_every {
                    self.receives_since_report = 0;
                    self.sink.append(timestamp, None, &aggregate.report_line())?;
                }
            }
            Ok(None) => {
                if let MoteEvent::Control { kind, .. } = &parsed {
                    self.metrics.record_control_message(kind.as_str());
                }
            }
            Err(err) => {
                self.metrics.dropped_events.inc();
                warn!(%err, timestamp, "packet event dropped");
            }
        }
        Ok(())
    }

    async fn tick_attacks(&mut self, now: u64) -> Result<(), EngineError> {
        let events = {
            let mut memory = self.memory.lock();
            self.scheduler.tick(now, &mut *memory)
        };
        if events.is_empty() {
            return Ok(());
        }

        for event in &events {
            self.sink.append(
                event.time(),
                Some(i64::from(event.target().get())),
                &event.message(),
            )?;
            let kind = match event {
                AttackEvent::Started { .. } => "started",
                AttackEvent::FaultApplied { .. } => "fault_applied",
                AttackEvent::Stopped { .. } => "stopped",
                AttackEvent::Deferred { .. } => "deferred",
            };
            self.metrics.record_attack_transition(kind);

            if let AttackEvent::Started { attack, target, time }
            | AttackEvent::Stopped { attack, target, time } = event
            {
                EventLogger::log_event(
                    &format!("attack_{kind}"),
                    vec![
                        KeyValue::new("attack", attack.clone()),
                        KeyValue::new("target", i64::from(target.get())),
                        KeyValue::new("time_us", *time as i64),
                    ],
                )
                .await;
            }
        }
        self.metrics
            .active_attacks
            .set(self.scheduler.active_count() as i64);
        Ok(())
    }

    /// Writes the per-node breakdown (PRR, then RPL control traffic) and the
    /// final totals, flushes the sink and seals the state hash.
    pub fn finish(mut self, timed_out: bool) -> Result<(RunSummary, S), EngineError> {
        let final_metrics = self.aggregator.compute_aggregate();
        let at = self.last_time;

        for (node, rate) in self.aggregator.node_reception_rates() {
            if rate.is_none() {
                continue;
            }
            let line = format!("Node {node} PRR {}", MetricValue::new(rate, 4));
            self.sink.append(at, Some(i64::from(node.get())), &line)?;
        }
        for (node, counts) in self.aggregator.node_control_counts() {
            let line = format!("Node {node} control {counts}");
            self.sink.append(at, Some(i64::from(node.get())), &line)?;
        }
        if final_metrics.control_messages.total() > 0 {
            let line = format!("Total control {}", final_metrics.control_messages);
            self.sink.append(at, None, &line)?;
        }
        self.sink.append(at, None, &final_metrics.final_line())?;
        self.sink.flush()?;

        let summary = RunSummary {
            state_hash: self.sink.digest(),
            lines_written: self.sink.lines(),
            events_processed: self.events_processed,
            attacks_finished: self.scheduler.all_finished(),
            timed_out,
            final_metrics,
        };
        info!(
            events = summary.events_processed,
            lines = summary.lines_written,
            hash = %summary.state_hash,
            "observer finished"
        );
        Ok((summary, self.sink.into_inner()))
    }
}
