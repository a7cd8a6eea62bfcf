//! Seedable random source threaded through every agent update.
//!
//! All "random" tactics (windup jitter, strafe flips, burst sizes, spawn
//! placement) draw from one [`SimRng`] owned by the manager, so a fixed
//! seed replays the same fight.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Simulation RNG service.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform float in `[min, max)`; returns `min` for an empty range.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }

    /// Uniform integer in `[min, max]`.
    pub fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Uniform index in `[0, len)`; `0` for an empty collection.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.unit() < p
    }

    /// `1.0` or `-1.0` with equal odds.
    pub fn sign(&mut self) -> f32 {
        if self.inner.gen::<bool>() {
            1.0
        } else {
            -1.0
        }
    }

    /// Random angle in `[0, TAU)`.
    pub fn angle(&mut self) -> f32 {
        self.range(0.0, std::f32::consts::TAU)
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Non-positive weights are never picked. Returns `None` when no weight
    /// is positive.
    pub fn weighted_index(&mut self, weights: &[f32]) -> Option<usize> {
        let total: f32 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.range(0.0, total);
        let mut last_valid = None;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            last_valid = Some(i);
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        last_valid
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0x5EED)
    }
}
