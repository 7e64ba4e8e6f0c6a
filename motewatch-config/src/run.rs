//! Run lifetime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock budget for the whole run.
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Periodic scheduler tick in simulated milliseconds.
    #[validate(range(min = 1))]
    pub tick_interval_ms: Option<u64>,

    /// Where bug reports land when a state hash does not match.
    pub diagnostics_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 600_000,
            tick_interval_ms: Some(1000),
            diagnostics_dir: PathBuf::from("bug_reports"),
        }
    }
}
