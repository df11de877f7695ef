//! Seed Commitment Protocol
//!
//! Publish a hash of the seed when drawing starts, reveal the seed when the
//! game ends. Anyone holding the commitment can then check that the draws
//! came from the revealed seed and not one picked after the fact.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{seed_digest, StateHash};
use crate::game::pool::draw_order;

/// Published commitment to a seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCommitment {
    /// SHA-256 over the domain tag and the seed bytes.
    pub hash: StateHash,
}

impl SeedCommitment {
    /// Commit to `seed`.
    pub fn commit(seed: &str) -> Self {
        Self { hash: seed_digest(seed) }
    }

    /// Whether `seed` opens this commitment.
    pub fn verify(&self, seed: &str) -> bool {
        Self::commit(seed) == *self
    }

    /// Lowercase hex, as announced in chat.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Parse an announced commitment.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let bytes = hex::decode(s.trim())?;
        let hash: StateHash = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CommitmentError::WrongLength(bytes.len()))?;
        Ok(Self { hash })
    }
}

/// Chat prefix of a seed reveal.
pub const REVEAL_PREFIX: &str = "Seed açıklandı: ";

/// A revealed seed with its commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReveal {
    pub commitment: SeedCommitment,
    pub seed: String,
}

impl SeedReveal {
    /// Reveal `seed`.
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self { commitment: SeedCommitment::commit(&seed), seed }
    }

    /// Check the seed against a commitment published earlier.
    pub fn verify(&self, published: &SeedCommitment) -> Result<(), CommitmentError> {
        if !published.verify(&self.seed) {
            return Err(CommitmentError::SeedMismatch);
        }
        Ok(())
    }

    /// Chat line announcing the seed.
    pub fn to_line(&self) -> String {
        format!("{REVEAL_PREFIX}{}", self.seed)
    }

    /// Parse a reveal announced in chat.
    pub fn from_line(line: &str) -> Option<Self> {
        line.strip_prefix(REVEAL_PREFIX).map(Self::new)
    }

    /// The full draw order implied by the revealed seed.
    pub fn draw_order(&self) -> Vec<u8> {
        draw_order(&self.seed)
    }
}

/// Commitment errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitmentError {
    /// Commitment text is not hex.
    #[error("invalid commitment hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Commitment has the wrong byte length.
    #[error("commitment must be 32 bytes, got {0}")]
    WrongLength(usize),

    /// Revealed seed does not open the commitment.
    #[error("revealed seed does not match commitment")]
    SeedMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_and_verify() {
        let commitment = SeedCommitment::commit("#test:1700000000000");
        assert!(commitment.verify("#test:1700000000000"));
        assert!(!commitment.verify("#test:1700000000001"));
    }

    #[test]
    fn test_commitment_is_domain_separated() {
        use sha2::{Digest, Sha256};
        let plain: StateHash = Sha256::digest(b"seed").into();
        assert_ne!(SeedCommitment::commit("seed").hash, plain);
    }

    #[test]
    fn test_hex_roundtrip() {
        let commitment = SeedCommitment::commit("hex");
        let text = commitment.to_hex();
        assert_eq!(text.len(), 64);
        assert_eq!(SeedCommitment::from_hex(&text), Ok(commitment));
    }

    #[test]
    fn test_bad_hex() {
        assert!(matches!(
            SeedCommitment::from_hex("zz"),
            Err(CommitmentError::InvalidHex(_))
        ));
        assert_eq!(
            SeedCommitment::from_hex("abcd"),
            Err(CommitmentError::WrongLength(2))
        );
    }

    #[test]
    fn test_reveal() {
        let published = SeedCommitment::commit("friday");
        let reveal = SeedReveal::new("friday");
        assert_eq!(reveal.verify(&published), Ok(()));
        assert_eq!(reveal.draw_order(), draw_order("friday"));

        let forged = SeedReveal::new("saturday");
        assert_eq!(forged.verify(&published), Err(CommitmentError::SeedMismatch));
    }

    #[test]
    fn test_reveal_line() {
        let reveal = SeedReveal::new("#test:1700000000000");
        assert_eq!(reveal.to_line(), "Seed açıklandı: #test:1700000000000");
        assert_eq!(SeedReveal::from_line(&reveal.to_line()), Some(reveal));
        assert_eq!(SeedReveal::from_line("Seed ayarlandı: x"), None);
    }
}
