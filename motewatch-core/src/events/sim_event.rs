//! Events delivered by the simulation host.

use bytes::Bytes;

/// One item off the event feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    /// A line a node wrote to its serial log.
    Log {
        /// Simulation time in microseconds.
        timestamp: u64,
        /// Raw id of the node that printed the line. Not range-checked.
        origin: i64,
        /// Raw log text, zero-copy.
        payload: Bytes,
    },

    /// Periodic host clock tick with no log content.
    ClockTick { timestamp: u64 },
}

impl SimEvent {
    #[inline]
    pub fn log(timestamp: u64, origin: i64, payload: impl Into<Bytes>) -> Self {
        SimEvent::Log {
            timestamp,
            origin,
            payload: payload.into(),
        }
    }

    #[inline]
    pub fn tick(timestamp: u64) -> Self {
        SimEvent::ClockTick { timestamp }
    }

    /// Simulation time of the event in microseconds.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        match self {
            SimEvent::Log { timestamp, .. } | SimEvent::ClockTick { timestamp } => *timestamp,
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            SimEvent::Log { payload, .. } => Some(payload),
            SimEvent::ClockTick { .. } => None,
        }
    }
}
