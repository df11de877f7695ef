//! Core deterministic primitives.
//!
//! Everything here is reproducible from a seed string alone.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::SeededRng;
pub use hash::{compute_state_hash, seed_digest, StateHash, StateHasher};
