//! Verification API
//!
//! Verify games by deterministic replay of their transcript.

use thiserror::Error;

use crate::core::hash::StateHash;
use crate::game::state::{ClaimOutcome, DrawOutcome, GameSession, SessionError};
use crate::game::win::Stage;
use crate::proof::transcript::{GameTranscript, TRANSCRIPT_VERSION};

/// Verification result.
#[derive(Debug)]
pub struct VerificationResult {
    /// Did verification pass?
    pub valid: bool,

    /// Final state hash (from replay).
    pub computed_final_hash: StateHash,

    /// Expected final hash (from transcript).
    pub expected_final_hash: StateHash,

    /// Draws replayed before stopping.
    pub draws_checked: usize,

    /// Awards confirmed before stopping.
    pub awards_checked: usize,

    /// Detailed error if verification failed.
    pub error: Option<VerificationError>,
}

/// Errors that can occur during verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Transcript version mismatch.
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    /// Seed does not open the commitment.
    #[error("seed does not match commitment")]
    CommitmentMismatch,

    /// A recorded draw differs from the seed's draw order.
    #[error("draw {index} mismatch: expected {expected:?}, got {got}")]
    DrawMismatch {
        index: usize,
        expected: Option<u8>,
        got: u8,
    },

    /// An award is not valid at its recorded draw count.
    #[error("{nick} cannot be awarded {stage:?} after {draw_count} draws")]
    InvalidAward {
        nick: String,
        stage: Stage,
        draw_count: usize,
    },

    /// Awards out of order or beyond the recorded draws.
    #[error("award at draw {draw_count} is out of sequence")]
    AwardOutOfSequence { draw_count: usize },

    /// Replay diverged from the recorded state.
    #[error("final state hash mismatch")]
    FinalStateMismatch,

    /// Session rejected the replayed roster or start.
    #[error("replay failed: {0}")]
    Session(#[from] SessionError),
}

struct Replay {
    session: GameSession,
    draws_checked: usize,
    awards_checked: usize,
}

/// Replay `transcript` from its seed and check every draw, award and the final hash.
pub fn verify_transcript(transcript: &GameTranscript) -> VerificationResult {
    let mut replay = Replay {
        session: GameSession::open(transcript.channel.as_str(), &transcript.seed),
        draws_checked: 0,
        awards_checked: 0,
    };

    let error = run_replay(transcript, &mut replay).err();
    let computed_final_hash = replay.session.compute_hash();
    let error = error.or_else(|| {
        (computed_final_hash != transcript.final_state_hash)
            .then_some(VerificationError::FinalStateMismatch)
    });

    VerificationResult {
        valid: error.is_none(),
        computed_final_hash,
        expected_final_hash: transcript.final_state_hash,
        draws_checked: replay.draws_checked,
        awards_checked: replay.awards_checked,
        error,
    }
}

fn run_replay(transcript: &GameTranscript, replay: &mut Replay) -> Result<(), VerificationError> {
    if transcript.version != TRANSCRIPT_VERSION {
        return Err(VerificationError::VersionMismatch {
            expected: TRANSCRIPT_VERSION,
            got: transcript.version,
        });
    }
    if !transcript.commitment.verify(&transcript.seed) {
        return Err(VerificationError::CommitmentMismatch);
    }

    for nick in &transcript.roster {
        replay.session.register_player(nick)?;
    }

    // A game that never started has nothing further to replay.
    if transcript.draws.is_empty() && transcript.awards.is_empty() {
        return Ok(());
    }
    replay.session.start()?;

    let mut awards = transcript.awards.iter().peekable();

    for draw_count in 0..=transcript.draws.len() {
        while let Some(award) = awards.next_if(|a| a.draw_count == draw_count) {
            match replay.session.verify_claim(&award.nick, transcript.single_winner_per_stage) {
                ClaimOutcome::Awarded { stage, .. } if stage == award.stage => {
                    replay.awards_checked += 1;
                }
                _ => {
                    return Err(VerificationError::InvalidAward {
                        nick: award.nick.clone(),
                        stage: award.stage,
                        draw_count,
                    });
                }
            }
        }

        let Some(&recorded) = transcript.draws.get(draw_count) else {
            break;
        };
        match replay.session.draw_number() {
            DrawOutcome::Drawn(number) if number == recorded => replay.draws_checked += 1,
            DrawOutcome::Drawn(number) => {
                return Err(VerificationError::DrawMismatch {
                    index: draw_count,
                    expected: Some(number),
                    got: recorded,
                });
            }
            _ => {
                return Err(VerificationError::DrawMismatch {
                    index: draw_count,
                    expected: None,
                    got: recorded,
                });
            }
        }
    }

    // Anything left was recorded out of order or past the last draw.
    if let Some(award) = awards.next() {
        return Err(VerificationError::AwardOutOfSequence { draw_count: award.draw_count });
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
