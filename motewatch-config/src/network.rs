//! Simulated network shape and metric scaling.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::invalid;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
#[validate(schema(function = "validate_server"))]
pub struct NetworkConfig {
    /// Number of motes; ids run from 0 to `node_count - 1`.
    #[validate(range(min = 1, max = 65536))]
    pub node_count: usize,

    /// Sink node every other mote sends to.
    pub server_id: u32,

    /// Application payload per packet, in bytes.
    pub payload_length_bytes: u64,

    /// Divides timestamp differences into delay seconds.
    #[validate(range(min = 1.0))]
    pub clock_divisor: f64,

    /// Multiplier applied to throughput.
    #[validate(range(exclusive_min = 0.0))]
    pub time_scale: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_count: 16,
            server_id: 1,
            payload_length_bytes: 100,
            clock_divisor: 10_000_000.0,
            time_scale: 1000.0,
        }
    }
}

fn validate_server(network: &NetworkConfig) -> Result<(), ValidationError> {
    if (network.server_id as usize) < network.node_count {
        Ok(())
    } else {
        Err(invalid("server_out_of_range", "server_id must be below node_count"))
    }
}
