//! Game Events
//!
//! Events recorded by a session as it changes, drained by the manager to
//! publish updates and by transcripts for verification.

use serde::{Serialize, Deserialize};

use crate::game::state::SessionStatus;
use crate::game::win::Stage;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEventData {
    /// A player received a card.
    PlayerJoined {
        nick: String,
    },

    /// A number came out of the pool.
    NumberDrawn {
        number: u8,
    },

    /// A stage was awarded.
    StageAwarded {
        stage: Stage,
        nick: String,
    },

    /// The 91st draw found the pool empty.
    PoolExhausted,

    /// Seed replaced; history cleared and cards regenerated.
    Reseeded {
        seed: String,
    },

    /// Lifecycle transition.
    StatusChanged {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// A game event stamped with the number of draws made when it happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Draws made so far (including a draw this event reports).
    pub draw_count: usize,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(draw_count: usize, data: GameEventData) -> Self {
        Self { draw_count, data }
    }

    /// Nick this event concerns, if any.
    pub fn nick(&self) -> Option<&str> {
        match &self.data {
            GameEventData::PlayerJoined { nick } => Some(nick),
            GameEventData::StageAwarded { nick, .. } => Some(nick),
            _ => None,
        }
    }
}
