//! # motewatch Metrics
//!
//! Online aggregation of packet send/receive events into network-wide
//! reception rate, delivery ratio, delay and throughput.

pub mod aggregator;
pub mod report;

pub use aggregator::{
    AggregateMetrics, Aggregator, ControlCounts, MetricsError, MetricsSettings, PerNodeStats,
};
pub use report::MetricValue;
