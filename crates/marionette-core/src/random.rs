//! Randomized template values
//!
//! Templates author jittered timing and amplitude as `[min, max, skew, samples]`.
//! Sampling averages `samples` uniform draws (a bell-shaped distribution),
//! raises the average to `skew` and scales it into `[min, max]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bell-shaped random range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
    pub min: f32,
    pub max: f32,
    /// Exponent applied to the averaged draw (1.0 = symmetric)
    pub skew: f32,
    /// Number of uniform draws averaged
    pub samples: u32,
}

impl RandomRange {
    pub const DEFAULT_SKEW: f32 = 1.0;
    pub const DEFAULT_SAMPLES: u32 = 5;

    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            skew: Self::DEFAULT_SKEW,
            samples: Self::DEFAULT_SAMPLES,
        }
    }

    pub fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Draw one value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let n = self.samples.max(1);
        let sum: f32 = (0..n).map(|_| rng.gen::<f32>()).sum();
        let r = (sum / n as f32).clamp(0.0, 1.0);
        self.min + r.powf(self.skew) * (self.max - self.min)
    }

    /// Midpoint, used where a deterministic value is needed
    pub fn mean(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    /// Range of the negated value (bounds swapped, skew kept)
    pub fn negated(&self) -> Self {
        Self {
            min: -self.max,
            max: -self.min,
            ..*self
        }
    }
}

/// Either a fixed number or a random range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Fixed(f32),
    Range(RandomRange),
}

impl Scalar {
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            Scalar::Fixed(v) => *v,
            Scalar::Range(r) => r.sample(rng),
        }
    }

    pub fn negated(&self) -> Scalar {
        match self {
            Scalar::Fixed(v) => Scalar::Fixed(-v),
            Scalar::Range(r) => Scalar::Range(r.negated()),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Fixed(0.0)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Fixed(v)
    }
}

impl From<RandomRange> for Scalar {
    fn from(r: RandomRange) -> Self {
        Scalar::Range(r)
    }
}

/// Shorthand for `Scalar::Range(RandomRange::new(min, max))`
pub fn range(min: f32, max: f32) -> Scalar {
    Scalar::Range(RandomRange::new(min, max))
}

/// Shorthand for a range with explicit skew and sample count
pub fn range_skewed(min: f32, max: f32, skew: f32, samples: u32) -> Scalar {
    Scalar::Range(RandomRange::new(min, max).with_skew(skew).with_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let r = RandomRange::new(3.0, 3.0);
        assert_eq!(r.sample(&mut rng), 3.0);
    }

    #[test]
    fn test_range_is_bell_shaped() {
        let mut rng = StdRng::seed_from_u64(7);
        let r = RandomRange::new(0.0, 1.0);
        let n = 10_000;
        let center = (0..n)
            .map(|_| r.sample(&mut rng))
            .filter(|v| (0.25..0.75).contains(v))
            .count();
        // A uniform draw would land in the middle half ~50% of the time
        assert!(center as f32 / n as f32 > 0.8);
    }

    #[test]
    fn test_skew_shifts_mass_low() {
        let mut rng = StdRng::seed_from_u64(11);
        let r = RandomRange::new(0.0, 1.0).with_skew(3.0);
        let avg: f32 = (0..2000).map(|_| r.sample(&mut rng)).sum::<f32>() / 2000.0;
        assert!(avg < 0.3);
    }

    proptest! {
        #[test]
        fn prop_sample_within_bounds(min in -100.0f32..100.0, span in 0.0f32..100.0,
                                     skew in 0.1f32..4.0, samples in 1u32..10, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let r = RandomRange::new(min, min + span).with_skew(skew).with_samples(samples);
            let v = r.sample(&mut rng);
            prop_assert!(v >= min - 1e-3 && v <= min + span + 1e-3);
        }
    }
}
