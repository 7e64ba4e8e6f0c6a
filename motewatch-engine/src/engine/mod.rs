mod diagnostics;
mod drivers;
mod error;
mod observer;
mod runtime;
mod runtime_trait;
mod state_hash;

pub use self::{
    diagnostics::{BugReport, DiagnosticsCollector},
    drivers::{ReplayDriver, SimulationDriver},
    error::EngineError,
    observer::{Observer, ObserverSettings, RunSummary},
    runtime::SimulationRuntime,
    runtime_trait::EventFeed,
    state_hash::HashingSink,
};
