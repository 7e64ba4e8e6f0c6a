//! Baseline-versus-attack comparison of two recorded run logs.
//!
//! Each log is read back through the same parser and aggregator the
//! observer uses, without running any attacks. The comparison lists, per
//! node, the delivery ratio and RPL control traffic of both runs.

use std::path::Path;

use tracing::{debug, info};

use motewatch_core::events::SimEvent;
use motewatch_core::NodeId;
use motewatch_metrics::{AggregateMetrics, Aggregator, ControlCounts, MetricValue, MetricsSettings};
use motewatch_protocols::CoojaLogParser;
use motewatch_simulator::TraceReplayer;

use crate::engine::EngineError;

/// What one run log amounts to.
#[derive(Debug, Clone)]
pub struct RunLogSummary {
    pub aggregate: AggregateMetrics,
    pub nodes: Vec<NodeSummary>,
    pub lines_read: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSummary {
    pub node: NodeId,
    pub packets_sent: u64,
    pub packets_received: u64,
    /// `None` for nodes that never sent.
    pub delivery_ratio_pct: Option<f64>,
    pub control: ControlCounts,
}

impl NodeSummary {
    fn is_active(&self) -> bool {
        self.packets_sent > 0 || self.packets_received > 0 || self.control.total() > 0
    }
}

pub fn summarize_run_log(path: &Path, settings: MetricsSettings) -> Result<RunLogSummary, EngineError> {
    let parser = CoojaLogParser::new();
    let mut aggregator = Aggregator::new(settings);
    let mut replayer = TraceReplayer::open(path)?;
    let mut lines_read = 0u64;

    while let Some(event) = replayer.next_event()? {
        lines_read += 1;
        if let SimEvent::Log {
            timestamp,
            origin,
            payload,
        } = &event
        {
            let parsed = parser.classify(payload, *origin, *timestamp);
            if let Err(err) = aggregator.apply(&parsed) {
                debug!(%err, timestamp, "run log event dropped");
            }
        }
    }

    let nodes = (0..settings.node_count)
        .filter_map(|i| {
            let node = NodeId::new(i as u32);
            let stats = aggregator.node_stats(node)?;
            Some(NodeSummary {
                node,
                packets_sent: stats.packets_sent,
                packets_received: stats.packets_received,
                delivery_ratio_pct: (stats.packets_sent > 0)
                    .then(|| stats.packets_received as f64 / stats.packets_sent as f64 * 100.0),
                control: stats.control,
            })
        })
        .collect();

    info!(path = %path.display(), lines_read, skipped = replayer.skipped(), "run log summarized");
    Ok(RunLogSummary {
        aggregate: aggregator.compute_aggregate(),
        nodes,
        lines_read,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeComparison {
    pub node: NodeId,
    pub baseline: NodeSummary,
    pub attacked: NodeSummary,
}

impl NodeComparison {
    /// Attacked minus baseline delivery ratio, in percentage points.
    pub fn pdr_change(&self) -> Option<f64> {
        Some(self.attacked.delivery_ratio_pct? - self.baseline.delivery_ratio_pct?)
    }
}

#[derive(Debug, Clone)]
pub struct RunComparison {
    pub baseline: AggregateMetrics,
    pub attacked: AggregateMetrics,
    /// Nodes with any traffic in either run, by id.
    pub nodes: Vec<NodeComparison>,
}

impl RunComparison {
    pub fn new(baseline: &RunLogSummary, attacked: &RunLogSummary) -> Self {
        let nodes = baseline
            .nodes
            .iter()
            .zip(&attacked.nodes)
            .filter(|(b, a)| b.is_active() || a.is_active())
            .map(|(b, a)| NodeComparison {
                node: b.node,
                baseline: *b,
                attacked: *a,
            })
            .collect();
        Self {
            baseline: baseline.aggregate.clone(),
            attacked: attacked.aggregate.clone(),
            nodes,
        }
    }

    /// Network-wide change in delivery ratio, in percentage points.
    pub fn pdr_change(&self) -> Option<f64> {
        Some(self.attacked.delivery_ratio_pct? - self.baseline.delivery_ratio_pct?)
    }

    /// One line per node, then the network-wide line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .nodes
            .iter()
            .map(|n| {
                format!(
                    "Node {} PDR {} -> {} ({}), control {} -> {}",
                    n.node,
                    MetricValue::new(n.baseline.delivery_ratio_pct, 2),
                    MetricValue::new(n.attacked.delivery_ratio_pct, 2),
                    MetricValue::new(n.pdr_change(), 2),
                    n.baseline.control,
                    n.attacked.control,
                )
            })
            .collect();
        lines.push(format!(
            "Total PDR {} -> {} ({}), control {} -> {}",
            MetricValue::new(self.baseline.delivery_ratio_pct, 2),
            MetricValue::new(self.attacked.delivery_ratio_pct, 2),
            MetricValue::new(self.pdr_change(), 2),
            self.baseline.control_messages,
            self.attacked.control_messages,
        ));
        lines
    }
}

/// Summarizes both logs with the same settings and lines them up per node.
pub fn compare_run_logs(
    baseline: &Path,
    attacked: &Path,
    settings: MetricsSettings,
) -> Result<RunComparison, EngineError> {
    let baseline = summarize_run_log(baseline, settings)?;
    let attacked = summarize_run_log(attacked, settings)?;
    Ok(RunComparison::new(&baseline, &attacked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEND_3: &str = "[INFO: App       ] Sending packet seqno 1 to fd00::201:1:1:1";
    const RECV_3: &str = "[INFO: App       ] Packet received from fd00::203:3:3:3 seqno 1";
    const DIO: &str = "[INFO: RPL       ] sending a DIO with rank 256 to ff02::1a";

    fn run_log(lines: &[(&str, i64, &str)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (time, node, message) in lines {
            writeln!(file, "{time}\tID:{node}\t{message}").unwrap();
        }
        file
    }

    fn settings() -> MetricsSettings {
        MetricsSettings {
            node_count: 4,
            ..MetricsSettings::default()
        }
    }

    #[test]
    fn summarizes_packets_and_control_traffic() {
        let log = run_log(&[
            ("1.000000", 3, SEND_3),
            ("1.020000", 1, RECV_3),
            ("2.000000", 3, SEND_3),
            ("2.500000", 2, DIO),
            ("3.000000", -1, "Total PRR 0.5000"),
        ]);
        let summary = summarize_run_log(log.path(), settings()).unwrap();

        assert_eq!(summary.lines_read, 5);
        assert_eq!(summary.aggregate.total_sent, 2);
        assert_eq!(summary.aggregate.total_received, 1);
        assert_eq!(summary.nodes[3].delivery_ratio_pct, Some(50.0));
        assert_eq!(summary.nodes[2].control.dio, 1);
        assert_eq!(summary.nodes[0].delivery_ratio_pct, None);
    }

    #[test]
    fn compares_delivery_and_control_per_node() {
        let baseline = run_log(&[
            ("1.000000", 3, SEND_3),
            ("1.020000", 1, RECV_3),
            ("2.000000", 3, SEND_3),
            ("2.020000", 1, RECV_3),
        ]);
        let attacked = run_log(&[
            ("1.000000", 3, SEND_3),
            ("1.020000", 1, RECV_3),
            ("2.000000", 3, SEND_3),
            ("2.100000", 3, DIO),
            ("2.200000", 3, DIO),
        ]);
        let comparison = compare_run_logs(baseline.path(), attacked.path(), settings()).unwrap();

        assert_eq!(comparison.nodes.len(), 1);
        let node = comparison.nodes[0];
        assert_eq!(node.node, NodeId::new(3));
        assert_eq!(node.pdr_change(), Some(-50.0));
        assert_eq!(comparison.pdr_change(), Some(-50.0));

        let lines = comparison.lines();
        assert_eq!(
            lines[0],
            "Node 3 PDR 100.00 -> 50.00 (-50.00), control DIS 0 DIO 0 DAO 0 -> DIS 0 DIO 2 DAO 0"
        );
        assert!(lines[1].starts_with("Total PDR 100.00 -> 50.00 (-50.00)"));
    }

    #[test]
    fn idle_runs_compare_as_undefined() {
        let empty = run_log(&[]);
        let comparison = compare_run_logs(empty.path(), empty.path(), settings()).unwrap();
        assert!(comparison.nodes.is_empty());
        assert_eq!(
            comparison.lines(),
            ["Total PDR undefined -> undefined (undefined), control DIS 0 DIO 0 DAO 0 -> DIS 0 DIO 0 DAO 0"]
        );
    }

    #[test]
    fn missing_log_is_a_feed_error() {
        let err = summarize_run_log(Path::new("no/such/run.log"), settings()).unwrap_err();
        assert!(matches!(err, EngineError::Feed(_)));
    }
}
