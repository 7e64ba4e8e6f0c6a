//! Core runtime parameters.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation;

#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct CoreConfig {
    #[validate(nested)]
    pub event_bus: EventBusConfig,
}

/// Sizing for the ring buffer between feed and observer.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = "validate_event_bus"))]
pub struct EventBusConfig {
    #[serde(default = "default_capacity")]
    #[validate(range(min = 2, max = 1048576))]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    4096
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn validate_event_bus(bus: &EventBusConfig) -> Result<(), ValidationError> {
    validation::validate_power_of_two(bus.capacity)
}
