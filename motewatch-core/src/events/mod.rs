//! ## motewatch-core::events
//! **Simulation events and the ordered single-consumer bus**
//!
//! Every event the feed produces is processed exactly once, in arrival
//! order. Delay and reception-rate bookkeeping pair each node's last send
//! with its last receive, so reordering would corrupt the metrics.

pub mod bus;
pub mod sim_event;

pub use bus::{EventBus, EventError};
pub use sim_event::SimEvent;
