//! Seedable random number generator shared by the scheduler and synthesizer.
//!
//! Every random decision the engine makes (premature-beat draws, block drops,
//! interval jitter, PVC morphology, fibrillation phases) flows through this
//! type so that a given seed always produces the same strip.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::types::Real;

/// A deterministic pseudo-random number generator.
///
/// Uses ChaCha20 for high-quality randomness with reproducible behavior
/// when seeded.
///
/// # Example
///
/// ```rust
/// use sinoatrial::utils::Random;
///
/// let mut rng = Random::new(42);
///
/// let f = rng.get_real64();
/// assert!((0.0..1.0).contains(&f));
///
/// let u = rng.signed_unit();
/// assert!((-1.0..1.0).contains(&u));
/// ```
pub struct Random {
    rng: ChaCha20Rng,
    seed: u64,
    /// Number of random values generated (for state reconstruction).
    steps: u64,
}

// Serialized as (seed, steps); the stream is replayed on deserialization.
#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct RandomState {
        seed: u64,
        steps: u64,
    }

    impl Serialize for Random {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let state = RandomState {
                seed: self.seed,
                steps: self.steps,
            };
            state.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Random {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let state = RandomState::deserialize(deserializer)?;
            let mut rng = ChaCha20Rng::seed_from_u64(state.seed);
            for _ in 0..state.steps {
                let _: u64 = rng.gen();
            }
            Ok(Random {
                rng,
                seed: state.seed,
                steps: state.steps,
            })
        }
    }
}

impl Random {
    /// Creates a new random number generator with the given seed.
    ///
    /// A negative seed draws the seed from system randomness.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        let actual_seed = if seed < 0 {
            rand::thread_rng().gen()
        } else {
            seed as u64
        };

        Self {
            rng: ChaCha20Rng::seed_from_u64(actual_seed),
            seed: actual_seed,
            steps: 0,
        }
    }

    /// Returns the seed used for this generator.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of random values generated.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Generates a random u64.
    pub fn get_uint64(&mut self) -> u64 {
        self.steps += 1;
        self.rng.gen()
    }

    /// Generates a random f64 in [0, 1).
    pub fn get_real64(&mut self) -> f64 {
        self.steps += 1;
        self.rng.gen()
    }

    /// Generates a random f64 in the range [min, max).
    pub fn get_real64_range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + (max - min) * self.get_real64()
    }

    /// Generates a value uniformly distributed in [-1, 1).
    pub fn signed_unit(&mut self) -> Real {
        self.get_real64_range(-1.0, 1.0)
    }

    /// Generates a random boolean with the given probability of being true.
    pub fn get_bool_with_prob(&mut self, probability: f64) -> bool {
        self.get_real64() < probability
    }

    /// Stateless hash of `(seed, key)` mapped to [-1, 1).
    ///
    /// Used where a value must be random-looking yet a pure function of its
    /// inputs, such as baseline noise evaluated at a given time.
    #[must_use]
    pub fn hash_unit(seed: u64, key: u64) -> Real {
        // splitmix64 finalizer
        let mut z = seed ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        let unit = (z >> 11) as Real / (1u64 << 53) as Real;
        unit * 2.0 - 1.0
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clone for Random {
    fn clone(&self) -> Self {
        Self {
            rng: self.rng.clone(),
            seed: self.seed,
            steps: self.steps,
        }
    }
}

impl std::fmt::Debug for Random {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Random")
            .field("seed", &self.seed)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
