//! Traffic simulator parameters.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::validate_probability;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
#[validate(schema(function = "validate_probabilities"))]
pub struct SimulatorConfig {
    /// Seed for deterministic simulation.
    pub seed: u64,
    /// Number of send events to generate.
    pub event_count: usize,
    /// Gap between two consecutive sends, in simulated milliseconds.
    #[validate(range(min = 1))]
    pub send_interval_ms: u64,
    pub latency_ms: u64,
    pub jitter_ms: u64,
    pub loss_probability: f64,
    /// Loss applied to motes whose attack flag is raised.
    pub compromised_loss_probability: f64,
    /// Bytes reserved per symbol in the mote memory images.
    #[validate(range(min = 1, max = 8))]
    pub symbol_size: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            event_count: 2000,
            send_interval_ms: 1000,
            latency_ms: 20,
            jitter_ms: 5,
            loss_probability: 0.02,
            compromised_loss_probability: 0.9,
            symbol_size: 1,
        }
    }
}

fn validate_probabilities(config: &SimulatorConfig) -> Result<(), ValidationError> {
    validate_probability(config.loss_probability)?;
    validate_probability(config.compromised_loss_probability)
}
