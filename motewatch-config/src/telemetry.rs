//! Logging configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
#[validate(schema(function = "validate_telemetry"))]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

fn validate_telemetry(config: &TelemetryConfig) -> Result<(), ValidationError> {
    validation::validate_log_level(&config.log_level)
}
