//! Human-readable rendering of aggregate snapshots.

use std::fmt;

use crate::aggregator::{AggregateMetrics, ControlCounts};

/// A possibly-withheld metric. Renders `undefined` when withheld.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricValue {
    value: Option<f64>,
    precision: usize,
}

impl MetricValue {
    pub fn new(value: Option<f64>, precision: usize) -> Self {
        Self { value, precision }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{:.*}", self.precision, v),
            None => f.write_str("undefined"),
        }
    }
}

impl fmt::Display for ControlCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DIS {} DIO {} DAO {}", self.dis, self.dio, self.dao)
    }
}

impl AggregateMetrics {
    /// Single-line periodic report.
    pub fn report_line(&self) -> String {
        self.to_string()
    }

    /// Final dump written when the run ends.
    pub fn final_line(&self) -> String {
        format!(
            "Total PRR {}, Total Delay: {:.6}, Packet Delivery Ratio: {}, Throughput: {}",
            MetricValue::new(self.reception_rate, 4),
            self.total_delay_seconds,
            MetricValue::new(self.delivery_ratio_pct, 2),
            MetricValue::new(self.throughput_bps, 3),
        )
    }
}

impl fmt::Display for AggregateMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Sent: {}, Total Received: {}, Packet Reception Rate: {}, \
             Total Delay: {:.6}, Average Delay: {}, Packet Delivery Ratio: {}, Throughput: {}",
            self.total_sent,
            self.total_received,
            MetricValue::new(self.reception_rate, 4),
            self.total_delay_seconds,
            MetricValue::new(self.average_delay_seconds, 6),
            MetricValue::new(self.delivery_ratio_pct, 2),
            MetricValue::new(self.throughput_bps, 3),
        )
    }
}
