use thiserror::Error;

use crate::node::NodeId;

/// Failures of a single memory write against a node image.
///
/// None of these are fatal: the attack scheduler treats every variant as
/// "not yet applied" and re-evaluates on the next tick.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("symbol '{symbol}' not found in memory of node {node}")]
    MissingSymbol { node: NodeId, symbol: String },

    #[error("no memory image for node {0}")]
    UnknownNode(NodeId),

    #[error("byte offset {offset} outside symbol '{symbol}' ({size} bytes)")]
    OffsetOutOfBounds {
        symbol: String,
        offset: usize,
        size: usize,
    },

    #[error("segment at {address:#06x} (+{len}) outside memory image")]
    SegmentOutOfBounds { address: usize, len: usize },
}

impl MemoryError {
    /// True for the missing-symbol case the scheduler retries on.
    pub fn is_missing_symbol(&self) -> bool {
        matches!(self, MemoryError::MissingSymbol { .. })
    }
}
