//! Fairness Proofs
//!
//! Lets players check that a game was not steered:
//! - Seed commitment announced before the first draw
//! - Transcript of the finished game
//! - Verification by deterministic replay
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs   - Seed commit at start, reveal at finish   │
//! │  transcript.rs   - Roster, draws and awards of one game     │
//! │  verify.rs       - Verification by replay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod transcript;
pub mod verify;

// Re-export key types
pub use commitment::{SeedCommitment, SeedReveal, CommitmentError, REVEAL_PREFIX};
pub use transcript::{GameTranscript, TRANSCRIPT_VERSION};
pub use verify::{verify_transcript, VerificationResult, VerificationError};
