pub mod compare;
pub mod engine;
pub mod runtime;

// Frontends only need the run modes.
pub use compare::RunComparison;
pub use runtime::{open_sink, run_compare_mode, run_replay_mode, run_simulation_mode};
