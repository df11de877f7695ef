//! Seeded Random Number Generator
//!
//! Lehmer (MINSTD) generator keyed by a string seed.
//! Given the same seed and call sequence, produces identical output on all platforms.
//!
//! Not suitable for anything security sensitive: the whole point is that
//! anyone holding the seed can reproduce every card and every draw.

use serde::{Serialize, Deserialize};

/// Modulus of the Lehmer recurrence (2^31 - 1, prime).
pub const MODULUS: u64 = 2_147_483_647;

/// MINSTD multiplier.
pub const MULTIPLIER: u64 = 48_271;

/// Multiplier used when folding the seed string into the initial state.
const SEED_FOLD: u64 = 31;

/// Deterministic PRNG seeded from a string.
///
/// # Determinism Guarantee
///
/// The state is always in `[1, MODULUS)`, so the sequence never collapses to
/// zero and has full period `MODULUS - 1`.
///
/// # Example
///
/// ```
/// use tombala::core::rng::SeededRng;
///
/// let mut rng = SeededRng::new("tombala");
/// assert_eq!(rng.next_int(90), 72); // Always the same!
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    seed: String,
    state: u64,
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new("")
    }
}

impl SeededRng {
    /// Create a new RNG from a string seed.
    pub fn new(seed: &str) -> Self {
        let mut rng = Self { seed: String::new(), state: 1 };
        rng.set_seed(seed);
        rng
    }

    /// Reset the internal state from the hash of `seed`.
    pub fn set_seed(&mut self, seed: &str) {
        self.seed = seed.to_owned();
        self.state = hash_seed(seed);
    }

    /// The seed this generator was last reset with.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Advance the recurrence and return the raw state.
    #[inline]
    fn step(&mut self) -> u64 {
        self.state = (self.state * MULTIPLIER) % MODULUS;
        self.state
    }

    /// Generate a float in `[0, 1)`.
    #[inline]
    pub fn next_float(&mut self) -> f64 {
        self.step() as f64 / MODULUS as f64
    }

    /// Generate a random integer in range `[0, max)`.
    ///
    /// Scales the state instead of taking a remainder. The bias is at most one
    /// part in `MODULUS / max` (about 1 in 2.4e7 for `max = 90`), spread evenly
    /// across the range rather than favouring low values.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        ((self.step() * max as u64) / MODULUS) as u32
    }

    /// Shuffle a slice in place using Fisher-Yates, last index first.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Current generator state.
    pub fn state(&self) -> u64 {
        self.state
    }

}

/// Fold a seed string into a nonzero state.
///
/// Hashes UTF-16 code units so seeds typed in any client map to the same state.
pub fn hash_seed(seed: &str) -> u64 {
    let hash = seed
        .encode_utf16()
        .fold(0u64, |h, unit| (h * SEED_FOLD + unit as u64) % MODULUS);

    if hash == 0 { 1 } else { hash }
}

// =============================================================================
// TESTS
// =============================================================================
