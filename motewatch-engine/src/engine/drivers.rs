//! Event feeds backed by the traffic simulator and by recorded traces.

use std::fs::File;
use std::io::BufReader;

use async_trait::async_trait;

use motewatch_core::events::SimEvent;
use motewatch_simulator::{TraceReplayer, TrafficSimulator};

use crate::engine::{EngineError, EventFeed};

pub struct SimulationDriver {
    simulator: TrafficSimulator,
}

impl SimulationDriver {
    pub fn new(simulator: TrafficSimulator) -> Self {
        Self { simulator }
    }

    pub fn simulator(&self) -> &TrafficSimulator {
        &self.simulator
    }
}

#[async_trait]
impl EventFeed for SimulationDriver {
    async fn next_event(&mut self) -> Result<Option<SimEvent>, EngineError> {
        Ok(self.simulator.next_event())
    }

    fn lockstep(&self) -> bool {
        true
    }
}

pub struct ReplayDriver {
    replayer: TraceReplayer<BufReader<File>>,
}

impl ReplayDriver {
    pub fn new(replayer: TraceReplayer<BufReader<File>>) -> Self {
        Self { replayer }
    }
}

#[async_trait]
impl EventFeed for ReplayDriver {
    async fn next_event(&mut self) -> Result<Option<SimEvent>, EngineError> {
        Ok(self.replayer.next_event()?)
    }
}
