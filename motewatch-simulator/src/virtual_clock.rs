//! # Virtual Clock
//!
//! Simulated time in microseconds, shared between the traffic generator and
//! whoever wants to read "now" without owning the generator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    now_us: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: Arc::new(AtomicU64::new(start_us)),
        }
    }

    #[inline]
    pub fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::Acquire)
    }

    /// Moves the clock forward to `us`. Earlier values are ignored, so time
    /// never runs backwards.
    #[inline]
    pub fn advance_to(&self, us: u64) {
        self.now_us.fetch_max(us, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let clock = VirtualClock::new(0);
        clock.advance_to(500);
        assert_eq!(clock.now_us(), 500);
        clock.advance_to(750);
        assert_eq!(clock.now_us(), 750);
    }

    #[test]
    fn advance_to_is_monotonic() {
        let clock = VirtualClock::new(100);
        let shared = clock.clone();
        shared.advance_to(1_000);
        clock.advance_to(400);
        assert_eq!(clock.now_us(), 1_000);
    }
}
