//! # Packet Loss Models

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub trait PacketLossModel: Send + Sync {
    fn should_drop(&mut self) -> bool;
}

/// Drops each packet independently with a fixed probability.
#[derive(Debug)]
pub struct ProbabilisticLossModel {
    drop_probability: f64,
    rng: SmallRng,
}

impl ProbabilisticLossModel {
    /// Probabilities outside `[0, 1]` are clamped.
    pub fn new(drop_probability: f64, seed: u64) -> Self {
        let drop_probability = if drop_probability.is_nan() {
            0.0
        } else {
            drop_probability.clamp(0.0, 1.0)
        };
        Self {
            drop_probability,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn drop_probability(&self) -> f64 {
        self.drop_probability
    }
}

impl PacketLossModel for ProbabilisticLossModel {
    #[inline]
    fn should_drop(&mut self) -> bool {
        self.rng.random_bool(self.drop_probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilistic_loss_model_probability() {
        let mut model = ProbabilisticLossModel::new(0.5, 42);
        let iterations = 10_000;
        let drops = (0..iterations).filter(|_| model.should_drop()).count();
        let drop_rate = drops as f64 / iterations as f64;
        assert!((drop_rate - 0.5).abs() < 0.05);
    }

    #[test]
    fn extremes_are_exact() {
        let mut never = ProbabilisticLossModel::new(0.0, 1);
        let mut always = ProbabilisticLossModel::new(1.0, 1);
        for _ in 0..100 {
            assert!(!never.should_drop());
            assert!(always.should_drop());
        }
        assert_eq!(ProbabilisticLossModel::new(3.0, 1).drop_probability(), 1.0);
    }
}
