//! Simulator and replay errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to open trace {path}: {source}")]
    OpenTrace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read trace at line {line}: {source}")]
    ReadTrace {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single trace line was skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceLineError {
    #[error("expected <time>\\tID:<node>\\t<message>")]
    MissingField,

    #[error("invalid timestamp {0:?}")]
    InvalidTime(String),

    #[error("invalid node field {0:?}")]
    InvalidNode(String),
}
