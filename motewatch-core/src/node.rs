//! Node identifiers.

use std::fmt;

/// Identifier of a simulated node, guaranteed to lie in `[0, node_count)`
/// for the node count it was checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Validates a raw (possibly negative) id coming off the event feed.
    #[inline]
    pub fn checked(raw: i64, node_count: usize) -> Option<Self> {
        if raw < 0 || raw as u64 >= node_count as u64 {
            return None;
        }
        u32::try_from(raw).ok().map(NodeId)
    }

    /// Builds an id without a range check. Callers own the invariant.
    #[inline]
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
