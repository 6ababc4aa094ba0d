//! Seeded randomness and per-session knobs shared by every spawner.

use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Explicit generation context.
///
/// Every random draw in a session goes through this value, so the same seed
/// and the same sequence of calls always produce the same level.
#[derive(Clone, Debug)]
pub struct GenerationContext {
    initial: ChaCha8Rng,
    rng: ChaCha8Rng,
    speed_multiplier: f32,
}

impl GenerationContext {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Use an existing generator. `reseed` rewinds to its current state.
    pub fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            initial: rng.clone(),
            rng,
            speed_multiplier: 1.0,
        }
    }

    /// Restart the random sequence from where this context began.
    pub fn reseed(&mut self) {
        self.rng = self.initial.clone();
    }

    /// Player speed scale of the current biome.
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }

    /// Uniform value in `[min, max]`. A degenerate, non-finite or
    /// unrepresentably wide range yields `min`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max > min && (max - min).is_finite() {
            self.rng.random_range(min..=max)
        } else {
            min
        }
    }

    /// Uniform value in `[-extent, extent]`.
    pub fn symmetric(&mut self, extent: f32) -> f32 {
        let extent = extent.abs();
        self.range(-extent, extent)
    }

    /// `-1.0` or `1.0` with equal odds.
    pub fn sign(&mut self) -> f32 {
        if self.rng.random::<bool>() { 1.0 } else { -1.0 }
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.random::<f32>() < p
    }

    /// Uniform pick from `items`.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}
