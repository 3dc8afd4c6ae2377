//! Random sources for the simulation.
//!
//! Every random decision a machine makes goes through [`Entropy`], so a run
//! can be driven by a seeded generator in production and by a fixed script
//! in tests.

use std::collections::VecDeque;
use std::time::Duration;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform draws in `[0, 1)`.
///
/// Only [`Entropy::unit`] is required; the other helpers derive from it so
/// that a scripted source controls every decision with one number each.
pub trait Entropy: Send {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform draw in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + self.unit() * (high - low)
    }

    /// Return true with the given probability in [0, 1].
    fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.unit() < probability
        }
    }

    /// Pick an index in `0..len`. Returns `None` for an empty range.
    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let idx = (self.unit() * len as f64) as usize;
        Some(idx.min(len - 1))
    }

    /// Uniform duration between `min` and `max`.
    fn duration_between(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let secs = self.uniform(min.as_secs_f64(), max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Seeded ChaCha generator.
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// Create a new generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the OS.
    #[must_use]
    pub fn from_os() -> Self {
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }

    /// Derive a child generator from the current stream.
    ///
    /// Physics and agents each get their own fork so their draws don't shift
    /// each other's sequences.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self::new(self.inner.next_u64())
    }
}

impl Entropy for SimRng {
    fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Replays a fixed sequence of unit draws.
///
/// Once the script runs out the last value repeats; an empty script yields
/// `0.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEntropy {
    script: VecDeque<f64>,
    last: f64,
}

impl ScriptedEntropy {
    /// Build from the draws to return, in order.
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: draws.into_iter().collect(),
            last: 0.0,
        }
    }

    /// Draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Entropy for ScriptedEntropy {
    fn unit(&mut self) -> f64 {
        if let Some(next) = self.script.pop_front() {
            self.last = next.clamp(0.0, 0.999_999);
        }
        self.last
    }
}
