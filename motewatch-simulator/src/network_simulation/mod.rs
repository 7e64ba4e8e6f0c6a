//! ## motewatch-simulator::network_simulation
//! **Seeded radio-link models**
//!
//! - `latency`: fixed propagation delay
//! - `jitter`: uniform random extra delay
//! - `packet_loss`: Bernoulli drop decisions

pub mod jitter;
pub mod latency;
pub mod packet_loss;
