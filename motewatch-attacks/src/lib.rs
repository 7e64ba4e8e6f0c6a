//! # motewatch Attack Scheduler
//!
//! Timed fault injection against node memory images. Each attack flips an
//! on/off flag in its target's memory when its window opens and closes, and
//! may replay a fault program of byte values while active.

pub mod descriptor;
pub mod program;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_memory;

pub use descriptor::{AttackDescriptor, AttackEvent, AttackState, Transition};
pub use program::{FaultProgram, FaultStep};
pub use scheduler::AttackScheduler;
