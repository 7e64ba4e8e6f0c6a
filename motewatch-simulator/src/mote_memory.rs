//! In-process memory images for simulated motes.
//!
//! Each mote gets a flat byte image and a symbol table. Symbols are laid out
//! back to back in definition order. The bank is shared between the traffic
//! generator, which reads attack flags, and the attack scheduler, which
//! writes them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use motewatch_attacks::descriptor::ACTIVE_SENTINEL;
use motewatch_core::memory::{read_byte, MemoryDirectory, NodeMemory, Symbol};
use motewatch_core::{MemoryError, NodeId};

pub type SharedMemory = Arc<Mutex<MoteMemoryBank>>;

#[derive(Debug, Clone)]
pub struct MoteMemory {
    node: NodeId,
    symbols: HashMap<String, Symbol>,
    /// Symbols whose first byte marks the mote as compromised.
    flags: Vec<String>,
    image: Vec<u8>,
}

impl MoteMemory {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            symbols: HashMap::new(),
            flags: Vec::new(),
            image: Vec::new(),
        }
    }

    /// Reserves `size` zeroed bytes for `name`. Redefining a symbol keeps the
    /// existing location.
    pub fn define(&mut self, name: &str, size: usize) -> Symbol {
        if let Some(existing) = self.symbols.get(name) {
            return *existing;
        }
        let symbol = Symbol {
            address: self.image.len(),
            size,
        };
        self.image.resize(self.image.len() + size, 0);
        self.symbols.insert(name.to_string(), symbol);
        debug!(node = %self.node, name, address = symbol.address, size, "symbol defined");
        symbol
    }

    /// Like [`MoteMemory::define`], and marks the symbol as an attack switch.
    pub fn define_flag(&mut self, name: &str, size: usize) -> Symbol {
        let symbol = self.define(name, size);
        if !self.flags.iter().any(|f| f == name) {
            self.flags.push(name.to_string());
        }
        symbol
    }

    /// True while any attack switch on this mote reads as active.
    pub fn is_compromised(&self) -> bool {
        self.flags
            .iter()
            .any(|flag| matches!(read_byte(self, flag, 0), Ok(ACTIVE_SENTINEL)))
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl NodeMemory for MoteMemory {
    fn node(&self) -> NodeId {
        self.node
    }

    fn lookup(&self, symbol: &str) -> Option<Symbol> {
        self.symbols.get(symbol).copied()
    }

    fn read_segment(&self, address: usize, size: usize) -> Result<Vec<u8>, MemoryError> {
        address
            .checked_add(size)
            .and_then(|end| self.image.get(address..end))
            .map(<[u8]>::to_vec)
            .ok_or(MemoryError::SegmentOutOfBounds { address, len: size })
    }

    fn write_segment(&mut self, address: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let len = bytes.len();
        address
            .checked_add(len)
            .and_then(|end| self.image.get_mut(address..end))
            .ok_or(MemoryError::SegmentOutOfBounds { address, len })?
            .copy_from_slice(bytes);
        Ok(())
    }
}

/// One image per mote, indexed by node id.
#[derive(Debug, Clone, Default)]
pub struct MoteMemoryBank {
    motes: Vec<MoteMemory>,
}

impl MoteMemoryBank {
    pub fn new(node_count: usize) -> Self {
        Self {
            motes: (0..node_count)
                .map(|i| MoteMemory::new(NodeId::new(i as u32)))
                .collect(),
        }
    }

    pub fn into_shared(self) -> SharedMemory {
        Arc::new(Mutex::new(self))
    }

    pub fn node_count(&self) -> usize {
        self.motes.len()
    }

    pub fn mote(&self, node: NodeId) -> Option<&MoteMemory> {
        self.motes.get(node.index())
    }

    pub fn mote_mut(&mut self, node: NodeId) -> Option<&mut MoteMemory> {
        self.motes.get_mut(node.index())
    }

    pub fn is_compromised(&self, node: NodeId) -> bool {
        self.mote(node).is_some_and(MoteMemory::is_compromised)
    }
}

impl MemoryDirectory for MoteMemoryBank {
    type Memory = MoteMemory;

    fn memory(&self, node: NodeId) -> Option<&MoteMemory> {
        self.mote(node)
    }

    fn memory_mut(&mut self, node: NodeId) -> Option<&mut MoteMemory> {
        self.mote_mut(node)
    }
}
