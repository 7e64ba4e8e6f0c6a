//! # Latency Models

use std::time::Duration;

pub trait LatencyModel: Send + Sync {
    fn apply_latency(&self, base_duration: Duration) -> Duration;
}

/// Always adds the same delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    delay: Duration,
}

impl FixedLatencyModel {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(latency_ms),
        }
    }
}

impl LatencyModel for FixedLatencyModel {
    #[inline]
    fn apply_latency(&self, base_duration: Duration) -> Duration {
        base_duration + self.delay
    }
}
