//! ## motewatch-core::memory
//! **Node memory access contract**
//!
//! A simulated node exposes a symbol table (name → address + size) and
//! byte-segment read/write over its memory image. Attacks flip single bytes
//! through [`write_byte`], which performs a read-modify-write of the whole
//! symbol segment. Only one writer exists (the attack scheduler), so the
//! read-modify-write needs no further coordination.

use tracing::trace;

use crate::error::MemoryError;
use crate::node::NodeId;

/// Location of a named variable inside a node's memory image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub address: usize,
    pub size: usize,
}

/// Memory image of a single node.
pub trait NodeMemory {
    /// Node owning this image.
    fn node(&self) -> NodeId;

    /// Resolves a symbol by name.
    fn lookup(&self, symbol: &str) -> Option<Symbol>;

    /// Copies `size` bytes starting at `address`.
    fn read_segment(&self, address: usize, size: usize) -> Result<Vec<u8>, MemoryError>;

    /// Overwrites the bytes starting at `address`.
    fn write_segment(&mut self, address: usize, bytes: &[u8]) -> Result<(), MemoryError>;
}

/// Resolves node ids to their memory images.
pub trait MemoryDirectory {
    type Memory: NodeMemory;

    fn memory(&self, node: NodeId) -> Option<&Self::Memory>;

    fn memory_mut(&mut self, node: NodeId) -> Option<&mut Self::Memory>;
}

/// Writes `value` at `offset` within `symbol`.
pub fn write_byte<M>(memory: &mut M, symbol: &str, offset: usize, value: u8) -> Result<(), MemoryError>
where
    M: NodeMemory + ?Sized,
{
    let sym = memory
        .lookup(symbol)
        .ok_or_else(|| MemoryError::MissingSymbol {
            node: memory.node(),
            symbol: symbol.to_string(),
        })?;
    if offset >= sym.size {
        return Err(MemoryError::OffsetOutOfBounds {
            symbol: symbol.to_string(),
            offset,
            size: sym.size,
        });
    }

    let mut segment = memory.read_segment(sym.address, sym.size)?;
    segment[offset] = value;
    memory.write_segment(sym.address, &segment)?;
    trace!(node = %memory.node(), symbol, offset, value, "memory byte written");
    Ok(())
}

/// Reads the byte at `offset` within `symbol`.
pub fn read_byte<M>(memory: &M, symbol: &str, offset: usize) -> Result<u8, MemoryError>
where
    M: NodeMemory + ?Sized,
{
    let sym = memory
        .lookup(symbol)
        .ok_or_else(|| MemoryError::MissingSymbol {
            node: memory.node(),
            symbol: symbol.to_string(),
        })?;
    if offset >= sym.size {
        return Err(MemoryError::OffsetOutOfBounds {
            symbol: symbol.to_string(),
            offset,
            size: sym.size,
        });
    }
    let segment = memory.read_segment(sym.address, sym.size)?;
    Ok(segment[offset])
}

/// [`write_byte`] against the image of `node` inside a directory.
pub fn write_node_byte<D>(
    directory: &mut D,
    node: NodeId,
    symbol: &str,
    offset: usize,
    value: u8,
) -> Result<(), MemoryError>
where
    D: MemoryDirectory + ?Sized,
{
    let memory = directory
        .memory_mut(node)
        .ok_or(MemoryError::UnknownNode(node))?;
    write_byte(memory, symbol, offset, value)
}
