//! Game Transcript Recording
//!
//! Everything needed to replay a game and check its outcome: the seed, the
//! roster in join order, the draws and the awards with the draw count at
//! which each was granted.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::state::{Award, GameSession, SessionStatus, Winners};
use crate::proof::commitment::SeedCommitment;

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Record of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTranscript {
    /// Version for forward compatibility.
    pub version: u8,

    /// Channel the game ran in.
    pub channel: String,

    /// Revealed seed.
    pub seed: String,

    /// Commitment announced at start.
    pub commitment: SeedCommitment,

    /// Nicks in join order; cards are dealt in this order.
    pub roster: Vec<String>,

    /// Numbers drawn, in order.
    pub draws: Vec<u8>,

    /// Awards in grant order.
    pub awards: Vec<Award>,

    /// Winner policy the game ran under.
    pub single_winner_per_stage: bool,

    /// Status when recorded.
    pub status: SessionStatus,

    /// Session state hash when recorded.
    pub final_state_hash: StateHash,
}

impl GameTranscript {
    /// Record `session` as it stands.
    pub fn from_session(session: &GameSession, single_winner_per_stage: bool) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            channel: session.channel().to_owned(),
            seed: session.seed().to_owned(),
            commitment: SeedCommitment::commit(session.seed()),
            roster: session.roster().into_iter().map(|p| p.nick.clone()).collect(),
            draws: session.drawn().to_vec(),
            awards: session.awards().to_vec(),
            single_winner_per_stage,
            status: session.status(),
            final_state_hash: session.compute_hash(),
        }
    }

    /// Winners implied by the awards.
    pub fn winners(&self) -> Winners {
        let mut winners = Winners::default();
        for award in &self.awards {
            winners.push(award.stage, award.nick.clone());
        }
        winners
    }

    /// Whether the game reached its end.
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
