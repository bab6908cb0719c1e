//! Injectable random source for the synthetic sensors.
//!
//! Every draw the engine makes goes through [`RandomSource`]. Each
//! simulation instance owns its own source, so two instances advanced in
//! parallel are reproducible independently of each other.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of the two kinds of draws the demand model needs.
pub trait RandomSource {
    /// A draw from the uniform distribution on `[-1, 1]`.
    fn signed_unit(&mut self) -> f64;

    /// A Bernoulli trial that succeeds with `probability`.
    ///
    /// Probabilities outside `[0, 1]` behave as the nearest bound.
    fn bernoulli(&mut self, probability: f64) -> bool;
}

/// Seeded pseudo-random source backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a source whose draw sequence is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn signed_unit(&mut self) -> f64 {
        self.rng.random_range(-1.0..=1.0)
    }

    fn bernoulli(&mut self, probability: f64) -> bool {
        // random::<f64>() is in [0, 1), so p = 0 never fires and p = 1 always does.
        self.rng.random::<f64>() < probability
    }
}

/// A source that returns the same draws forever.
///
/// `ConstantRandom::quiet()` disables all jitter and never toggles an
/// emergency; tests use it to make every transition exactly predictable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRandom {
    signed: f64,
    events: bool,
}

impl ConstantRandom {
    /// Always draw `signed` (clamped to `[-1, 1]`) and always report
    /// `events` for Bernoulli trials with a non-zero probability.
    pub fn new(signed: f64, events: bool) -> Self {
        Self {
            signed: signed.clamp(-1.0, 1.0),
            events,
        }
    }

    /// No jitter, no emergency toggles.
    pub fn quiet() -> Self {
        Self::new(0.0, false)
    }
}

impl RandomSource for ConstantRandom {
    fn signed_unit(&mut self) -> f64 {
        self.signed
    }

    fn bernoulli(&mut self, probability: f64) -> bool {
        self.events && probability > 0.0
    }
}
