use std::path::PathBuf;

use thiserror::Error;

use motewatch_config::ConfigError;
use motewatch_core::events::EventError;
use motewatch_simulator::SimulatorError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state hash mismatch: expected {expected}, got {actual} (report: {})", report.display())]
    HashMismatch {
        expected: String,
        actual: String,
        report: PathBuf,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event bus error: {0}")]
    Bus(#[from] EventError),

    #[error("Event feed error: {0}")]
    Feed(#[from] SimulatorError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Bug report encoding error: {0}")]
    Report(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
