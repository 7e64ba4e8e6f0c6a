//! The event feed the runtime drains.

use async_trait::async_trait;

use motewatch_core::events::SimEvent;

use crate::engine::EngineError;

#[async_trait]
pub trait EventFeed: Send {
    /// Next event in timestamp order, `None` once the feed is exhausted.
    async fn next_event(&mut self) -> Result<Option<SimEvent>, EngineError>;

    /// Feeds whose next event depends on state the observer writes (mote
    /// memory) must not run ahead of it. The runtime then hands over one
    /// event at a time.
    fn lockstep(&self) -> bool {
        false
    }
}
