//! In-memory node images for scheduler tests.

use std::collections::HashMap;

use motewatch_core::memory::{MemoryDirectory, NodeMemory, Symbol};
use motewatch_core::{MemoryError, NodeId};

pub struct TestMemory {
    node: NodeId,
    symbols: HashMap<String, Symbol>,
    bytes: Vec<u8>,
    writes: Vec<(usize, Vec<u8>)>,
}

impl NodeMemory for TestMemory {
    fn node(&self) -> NodeId {
        self.node
    }

    fn lookup(&self, symbol: &str) -> Option<Symbol> {
        self.symbols.get(symbol).copied()
    }

    fn read_segment(&self, address: usize, size: usize) -> Result<Vec<u8>, MemoryError> {
        self.bytes
            .get(address..address + size)
            .map(<[u8]>::to_vec)
            .ok_or(MemoryError::SegmentOutOfBounds { address, len: size })
    }

    fn write_segment(&mut self, address: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let len = bytes.len();
        self.bytes
            .get_mut(address..address + len)
            .ok_or(MemoryError::SegmentOutOfBounds { address, len })?
            .copy_from_slice(bytes);
        self.writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct TestDirectory {
    nodes: HashMap<NodeId, TestMemory>,
}

impl TestDirectory {
    pub fn with_symbols(node: NodeId, symbols: &[&str]) -> Self {
        let mut directory = Self::default();
        directory.nodes.insert(
            node,
            TestMemory {
                node,
                symbols: HashMap::new(),
                bytes: vec![0; 64],
                writes: Vec::new(),
            },
        );
        for symbol in symbols {
            directory.add_symbol(node, symbol);
        }
        directory
    }

    pub fn add_symbol(&mut self, node: NodeId, symbol: &str) {
        let memory = self.nodes.get_mut(&node).expect("node registered");
        let address = memory.symbols.len() * 4;
        memory
            .symbols
            .entry(symbol.to_string())
            .or_insert(Symbol { address, size: 1 });
    }

    pub fn remove_symbol(&mut self, node: NodeId, symbol: &str) {
        if let Some(memory) = self.nodes.get_mut(&node) {
            memory.symbols.remove(symbol);
        }
    }

    pub fn byte(&self, node: NodeId, symbol: &str) -> Option<u8> {
        let memory = self.nodes.get(&node)?;
        let sym = memory.symbols.get(symbol)?;
        memory.bytes.get(sym.address).copied()
    }

    pub fn writes_to(&self, node: NodeId, symbol: &str) -> Vec<u8> {
        let Some(memory) = self.nodes.get(&node) else {
            return Vec::new();
        };
        let Some(sym) = memory.symbols.get(symbol) else {
            return Vec::new();
        };
        memory
            .writes
            .iter()
            .filter(|(address, _)| *address == sym.address)
            .map(|(_, bytes)| bytes[0])
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.nodes.values().map(|m| m.writes.len()).sum()
    }
}

impl MemoryDirectory for TestDirectory {
    type Memory = TestMemory;

    fn memory(&self, node: NodeId) -> Option<&TestMemory> {
        self.nodes.get(&node)
    }

    fn memory_mut(&mut self, node: NodeId) -> Option<&mut TestMemory> {
        self.nodes.get_mut(&node)
    }
}
