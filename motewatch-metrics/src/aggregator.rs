//! ## motewatch-metrics::aggregator
//! **Per-node counters and the network-wide recompute**
//!
//! Every node keeps its send/receive counters and the timestamp of its most
//! recent send and receive. Each receive event triggers a full recompute over
//! all nodes:
//!
//! - `reception_rate = total_received / total_sent`
//! - `delivery_ratio_pct = reception_rate * 100`
//! - per-node delay `(last_receive - last_send) / clock_divisor`, summed only
//!   when strictly positive
//! - `throughput = total_received * payload_bits * time_scale / elapsed`
//!
//! Ratios are withheld (`None`) instead of dividing by zero. RPL control
//! messages (DIS, DIO, DAO) are counted per node and summed into the
//! aggregate; they never touch the packet counters.

use thiserror::Error;
use tracing::debug;

use motewatch_core::NodeId;
use motewatch_protocols::{ControlMessage, MoteEvent};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("node id {node} outside [0, {node_count})")]
    NodeOutOfRange { node: i64, node_count: usize },
}

/// Immutable run parameters the aggregator needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsSettings {
    pub node_count: usize,
    pub payload_length_bytes: u64,
    /// Divides raw timestamp differences into delay seconds.
    pub clock_divisor: f64,
    /// Multiplier applied to throughput before dividing by elapsed time.
    pub time_scale: f64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            node_count: 16,
            payload_length_bytes: 100,
            clock_divisor: 10_000_000.0,
            time_scale: 1_000.0,
        }
    }
}

/// RPL control messages sent, by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlCounts {
    pub dis: u64,
    pub dio: u64,
    pub dao: u64,
}

impl ControlCounts {
    pub fn record(&mut self, kind: ControlMessage) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: ControlMessage) -> u64 {
        match kind {
            ControlMessage::Dis => self.dis,
            ControlMessage::Dio => self.dio,
            ControlMessage::Dao => self.dao,
        }
    }

    pub fn total(&self) -> u64 {
        self.dis + self.dio + self.dao
    }

    fn slot(&mut self, kind: ControlMessage) -> &mut u64 {
        match kind {
            ControlMessage::Dis => &mut self.dis,
            ControlMessage::Dio => &mut self.dio,
            ControlMessage::Dao => &mut self.dao,
        }
    }

    fn add(&mut self, other: &ControlCounts) {
        self.dis += other.dis;
        self.dio += other.dio;
        self.dao += other.dao;
    }
}

/// Counters and last-seen timestamps of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerNodeStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub last_send_time: u64,
    pub last_receive_time: u64,
    pub control: ControlCounts,
}

impl PerNodeStats {
    /// Delay between the node's last send and last receive, if it has
    /// received anything at all. May be zero or negative.
    fn delay_seconds(&self, clock_divisor: f64) -> Option<f64> {
        if self.last_receive_time == 0 {
            return None;
        }
        let diff = self.last_receive_time as i128 - self.last_send_time as i128;
        Some(diff as f64 / clock_divisor)
    }
}

/// Network-wide snapshot derived from all per-node stats.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateMetrics {
    pub total_sent: u64,
    pub total_received: u64,
    pub total_delay_seconds: f64,
    pub delay_sample_count: u64,
    /// `None` while nothing has been sent.
    pub reception_rate: Option<f64>,
    /// `None` while nothing has been sent.
    pub delivery_ratio_pct: Option<f64>,
    /// `None` without positive delay samples.
    pub average_delay_seconds: Option<f64>,
    /// `None` while no simulated time has elapsed.
    pub throughput_bps: Option<f64>,
    /// Timestamp of the latest applied event.
    pub elapsed: u64,
    /// Network-wide RPL control traffic.
    pub control_messages: ControlCounts,
}

/// Owned aggregation state for one run.
#[derive(Clone, Debug)]
pub struct Aggregator {
    settings: MetricsSettings,
    stats: Vec<PerNodeStats>,
    latest_timestamp: u64,
}

impl Aggregator {
    pub fn new(settings: MetricsSettings) -> Self {
        Self {
            stats: vec![PerNodeStats::default(); settings.node_count],
            settings,
            latest_timestamp: 0,
        }
    }

    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    fn check(&self, raw: i64) -> Result<NodeId, MetricsError> {
        NodeId::checked(raw, self.settings.node_count).ok_or(MetricsError::NodeOutOfRange {
            node: raw,
            node_count: self.settings.node_count,
        })
    }

    fn observe_time(&mut self, timestamp: u64) {
        self.latest_timestamp = self.latest_timestamp.max(timestamp);
    }

    /// Records a packet sent by `node`.
    pub fn on_sent(&mut self, node: i64, timestamp: u64) -> Result<NodeId, MetricsError> {
        let id = self.check(node)?;
        let stats = &mut self.stats[id.index()];
        stats.packets_sent += 1;
        stats.last_send_time = timestamp;
        self.observe_time(timestamp);
        Ok(id)
    }

    /// Records a packet from `sender` reaching the server and returns the
    /// recomputed aggregate.
    pub fn on_received(
        &mut self,
        sender: i64,
        timestamp: u64,
    ) -> Result<AggregateMetrics, MetricsError> {
        let id = self.check(sender)?;
        let stats = &mut self.stats[id.index()];
        stats.packets_received += 1;
        stats.last_receive_time = timestamp;
        self.observe_time(timestamp);
        Ok(self.compute_aggregate())
    }

    /// Records an RPL control message sent by `node`.
    pub fn on_control(
        &mut self,
        node: i64,
        kind: ControlMessage,
        timestamp: u64,
    ) -> Result<NodeId, MetricsError> {
        let id = self.check(node)?;
        self.stats[id.index()].control.record(kind);
        self.observe_time(timestamp);
        Ok(id)
    }

    /// Applies a parsed event. Returns the fresh aggregate for receive events.
    pub fn apply(&mut self, event: &MoteEvent) -> Result<Option<AggregateMetrics>, MetricsError> {
        match event {
            MoteEvent::Sent { node, timestamp } => {
                self.on_sent(*node, *timestamp)?;
                Ok(None)
            }
            MoteEvent::Received { sender, timestamp } => {
                self.on_received(*sender, *timestamp).map(Some)
            }
            MoteEvent::Control {
                node,
                kind,
                timestamp,
            } => {
                self.on_control(*node, *kind, *timestamp)?;
                Ok(None)
            }
            MoteEvent::Ignored { reason } => {
                debug!(%reason, "event ignored");
                Ok(None)
            }
        }
    }

    /// Recomputes the aggregate from all per-node stats.
    pub fn compute_aggregate(&self) -> AggregateMetrics {
        let mut total_sent = 0u64;
        let mut total_received = 0u64;
        let mut total_delay_seconds = 0.0;
        let mut delay_sample_count = 0u64;
        let mut control_messages = ControlCounts::default();

        for stats in &self.stats {
            total_sent += stats.packets_sent;
            total_received += stats.packets_received;
            control_messages.add(&stats.control);
            if let Some(delay) = stats.delay_seconds(self.settings.clock_divisor) {
                if delay > 0.0 {
                    total_delay_seconds += delay;
                    delay_sample_count += 1;
                }
            }
        }

        let reception_rate = ratio(total_received, total_sent);
        let delivery_ratio_pct = reception_rate.map(|rate| rate * 100.0);
        let average_delay_seconds =
            (delay_sample_count > 0).then(|| total_delay_seconds / delay_sample_count as f64);
        let throughput_bps = (self.latest_timestamp > 0).then(|| {
            let payload_bits = self.settings.payload_length_bytes as f64 * 8.0;
            total_received as f64 * payload_bits * self.settings.time_scale
                / self.latest_timestamp as f64
        });

        if total_sent == 0 && total_received > 0 {
            debug!(total_received, "receives recorded before any send");
        }

        AggregateMetrics {
            total_sent,
            total_received,
            total_delay_seconds,
            delay_sample_count,
            reception_rate,
            delivery_ratio_pct,
            average_delay_seconds,
            throughput_bps,
            elapsed: self.latest_timestamp,
            control_messages,
        }
    }

    pub fn node_stats(&self, node: NodeId) -> Option<&PerNodeStats> {
        self.stats.get(node.index())
    }

    /// Per-node reception rate; withheld for nodes that never sent.
    pub fn node_reception_rates(&self) -> Vec<(NodeId, Option<f64>)> {
        self.stats
            .iter()
            .enumerate()
            .map(|(i, s)| {
                (
                    NodeId::new(i as u32),
                    ratio(s.packets_received, s.packets_sent),
                )
            })
            .collect()
    }

    /// Per-node control traffic for nodes that sent any.
    pub fn node_control_counts(&self) -> Vec<(NodeId, ControlCounts)> {
        self.stats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.control.total() > 0)
            .map(|(i, s)| (NodeId::new(i as u32), s.control))
            .collect()
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}
