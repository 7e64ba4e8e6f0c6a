//! # motewatch-core
//!
//! Foundation layer shared by every motewatch crate.
//!
//! ### Key Submodules:
//! - `events`: simulation events and the single-consumer ring-buffer bus
//! - `memory`: node memory access contract (symbol lookup, segment read/write)
//! - `node`: range-checked node identifiers

pub mod error;
pub mod events;
pub mod memory;
pub mod node;

pub use error::MemoryError;
pub use node::NodeId;
