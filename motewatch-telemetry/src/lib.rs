//! # motewatch Telemetry
//!
//! Crate for logging, metrics, and the run-log sink.

pub mod logging;
pub mod metrics;
pub mod sink;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
pub use sink::{format_line, LineSink, MemorySink, Sink};
