//! Run-log and report output.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Run log file. Standard output when absent.
    pub log_path: Option<PathBuf>,

    /// Write an aggregate report every N receive events.
    #[validate(range(min = 1))]
    pub report_every: u64,

    /// Copy every raw feed line into the run log.
    pub echo_events: bool,

    /// Write unparseable lines to the run log as warnings.
    pub parse_warnings: bool,

    /// Prometheus text dump written at the end of the run.
    pub metrics_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            report_every: 1,
            echo_events: false,
            parse_warnings: false,
            metrics_path: None,
        }
    }
}
