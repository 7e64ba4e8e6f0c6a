//! Drives one feed through one observer over the event bus.
//!
//! The producer pulls from the feed and pushes onto the bus, yielding while
//! the bus is full. The consumer pops in arrival order and yields while the
//! bus is empty. Lockstep feeds wait for the bus to drain before producing
//! the next event. Both run joined on the calling task under the run timeout.
//! On timeout the observer keeps whatever it has processed and the final
//! dump is written from that state.

use std::time::Duration;

use tokio::task::yield_now;
use tracing::{debug, info, instrument, trace, warn};

use motewatch_core::events::{EventBus, EventError, SimEvent};
use motewatch_telemetry::Sink;

use crate::engine::{EngineError, EventFeed, Observer, RunSummary};

pub struct SimulationRuntime<F> {
    event_bus: EventBus,
    driver: F,
    timeout: Duration,
}

impl<F: EventFeed> SimulationRuntime<F> {
    pub fn new(driver: F, bus_capacity: usize, timeout: Duration) -> Result<Self, EngineError> {
        let event_bus = EventBus::with_capacity(bus_capacity)?;
        debug!(capacity = bus_capacity, ?timeout, "simulation runtime created");
        Ok(Self {
            event_bus,
            driver,
            timeout,
        })
    }

    #[instrument(skip_all, fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn run<S: Sink>(
        mut self,
        mut observer: Observer<S>,
    ) -> Result<(RunSummary, S), EngineError> {
        let producer_bus = self.event_bus.share();
        let consumer_bus = self.event_bus.share();

        let outcome = {
            let produce = produce(&mut self.driver, &producer_bus);
            let consume = consume(&consumer_bus, &mut observer);
            tokio::time::timeout(self.timeout, async { tokio::join!(produce, consume) }).await
        };

        let timed_out = match outcome {
            Ok((produced, consumed)) => {
                produced?;
                consumed?;
                false
            }
            Err(_) => {
                warn!(
                    processed = observer.events_processed(),
                    queued = self.event_bus.len(),
                    "run timed out, dumping partial results"
                );
                true
            }
        };

        info!(timed_out, "event feed finished");
        observer.finish(timed_out)
    }
}

async fn produce<F: EventFeed>(driver: &mut F, bus: &EventBus) -> Result<(), EngineError> {
    let lockstep = driver.lockstep();
    let result = async {
        while let Some(event) = driver.next_event().await? {
            push(bus, event).await?;
            while lockstep && !bus.is_empty() {
                yield_now().await;
            }
        }
        Ok(())
    }
    .await;
    bus.close();
    result
}

/// Retries until the consumer makes room.
async fn push(bus: &EventBus, event: SimEvent) -> Result<(), EngineError> {
    loop {
        match bus.send(event.clone()) {
            Ok(()) => return Ok(()),
            Err(EventError::QueueFull) => {
                trace!("event bus full, yielding to consumer");
                yield_now().await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn consume<S: Sink>(bus: &EventBus, observer: &mut Observer<S>) -> Result<(), EngineError> {
    loop {
        match bus.recv() {
            Some(event) => observer.process(&event).await?,
            None if bus.is_drained() => return Ok(()),
            None => yield_now().await,
        }
    }
}
