//! # Jitter Models

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub trait JitterModel: Send + Sync {
    fn apply_jitter(&mut self, base_duration: Duration) -> Duration;
}

/// Adds a uniform delay of `0..=magnitude_ms`, drawn from a seeded RNG so a
/// run can be reproduced.
#[derive(Debug)]
pub struct RandomJitterModel {
    magnitude_ms: u64,
    rng: SmallRng,
}

impl RandomJitterModel {
    pub fn new(magnitude_ms: u64, seed: u64) -> Self {
        Self {
            magnitude_ms,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl JitterModel for RandomJitterModel {
    #[inline]
    fn apply_jitter(&mut self, base_duration: Duration) -> Duration {
        if self.magnitude_ms == 0 {
            return base_duration;
        }
        let added_us = self.rng.random_range(0..=self.magnitude_ms * 1000);
        base_duration + Duration::from_micros(added_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_jitter_model_range() {
        let mut model = RandomJitterModel::new(50, 1);
        let base = Duration::from_millis(100);
        for _ in 0..100 {
            let jittered = model.apply_jitter(base);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_millis(50));
        }
    }

    #[test]
    fn same_seed_same_jitter() {
        let mut a = RandomJitterModel::new(10, 9);
        let mut b = RandomJitterModel::new(10, 9);
        for _ in 0..20 {
            assert_eq!(a.apply_jitter(Duration::ZERO), b.apply_jitter(Duration::ZERO));
        }
    }
}
