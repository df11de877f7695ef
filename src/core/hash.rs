//! Game Digests
//!
//! SHA-256 digests that pin a game down:
//! - the session state hash a transcript replay must reproduce
//! - the seed commitment announced before the first draw
//!
//! Every variable-length field is length-prefixed, so two different
//! layouts can never feed the same bytes to the hash.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Domain tag of session state hashes.
pub const STATE_DOMAIN: &[u8] = b"TOMBALA_STATE_V1";

/// Domain tag of seed commitments.
pub const SEED_DOMAIN: &[u8] = b"TOMBALA_SEED_V1";

/// Incremental hasher over session fields. Write order matters.
pub struct StateHasher {
    inner: Sha256,
}

impl StateHasher {
    /// Start a digest under `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    /// Write a u32 (little-endian).
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.inner.update(value.to_le_bytes());
    }

    /// Write a string.
    pub fn write_str(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.inner.update(value.as_bytes());
    }

    /// Write a list of strings.
    pub fn write_strs(&mut self, values: &[String]) {
        self.write_u32(values.len() as u32);
        for value in values {
            self.write_str(value);
        }
    }

    /// Write a list of drawn numbers.
    pub fn write_numbers(&mut self, numbers: &[u8]) {
        self.write_u32(numbers.len() as u32);
        self.inner.update(numbers);
    }

    /// Write card cells; an empty cell is written as 0.
    pub fn write_cells<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<u8>>,
    {
        for cell in cells {
            self.inner.update([cell.unwrap_or(0)]);
        }
    }

    /// Finish the digest.
    pub fn finish(self) -> StateHash {
        self.inner.finalize().into()
    }
}

/// Digest committed to when a game starts: SHA-256 over the seed domain tag
/// followed by the seed bytes.
pub fn seed_digest(seed: &str) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(SEED_DOMAIN);
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// Session state hash.
///
/// Called by `GameSession::compute_hash()`. The seed and the draw history
/// go in first; `add_state` appends roster and winners.
pub fn compute_state_hash<F>(seed: &str, drawn: &[u8], add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::new(STATE_DOMAIN);
    hasher.write_str(seed);
    hasher.write_numbers(drawn);
    add_state(&mut hasher);
    hasher.finish()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(write: impl FnOnce(&mut StateHasher)) -> StateHash {
        let mut hasher = StateHasher::new(b"test");
        write(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_seed_digest_layout() {
        let mut expected = Sha256::new();
        expected.update(b"TOMBALA_SEED_V1seed");
        let expected: StateHash = expected.finalize().into();

        assert_eq!(seed_digest("seed"), expected);
        assert_ne!(seed_digest("seed"), seed_digest("seed2"));
    }

    #[test]
    fn test_strings_are_length_prefixed() {
        let split_late = digest(|h| {
            h.write_str("ab");
            h.write_str("c");
        });
        let split_early = digest(|h| {
            h.write_str("a");
            h.write_str("bc");
        });
        assert_ne!(split_late, split_early);
    }

    #[test]
    fn test_lists_are_length_prefixed() {
        let a = digest(|h| {
            h.write_numbers(&[1, 2]);
            h.write_numbers(&[3]);
        });
        let b = digest(|h| {
            h.write_numbers(&[1]);
            h.write_numbers(&[2, 3]);
        });
        assert_ne!(a, b);

        let one = digest(|h| h.write_strs(&["alice".to_string()]));
        let none = digest(|h| h.write_strs(&[]));
        assert_ne!(one, none);
    }

    #[test]
    fn test_cell_order_matters() {
        let a = digest(|h| h.write_cells([Some(5), None]));
        let b = digest(|h| h.write_cells([None, Some(5)]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_state_hash() {
        let add = |h: &mut StateHasher| h.write_str("alice");

        let hash = compute_state_hash("seed", &[5, 17], add);
        assert_eq!(hash, compute_state_hash("seed", &[5, 17], add));
        assert_ne!(hash, compute_state_hash("seed", &[5, 17, 3], add));
        assert_ne!(hash, compute_state_hash("other", &[5, 17], add));
    }
}
