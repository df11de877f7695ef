//! Game Logic Module
//!
//! Everything that decides a game. 100% deterministic: given the seed and the
//! order of commands, every card, draw and award is reproducible.
//!
//! ## Module Structure
//!
//! - `card`: 3x9 card layout and generation
//! - `pool`: Shuffled 1..=90 draw pool
//! - `win`: Marking and çinko/tombala evaluation
//! - `state`: Per-channel session lifecycle
//! - `events`: Game events for publishing and transcripts

pub mod card;
pub mod pool;
pub mod win;
pub mod state;
pub mod events;

// Re-export key types
pub use card::{Card, CardError, generate_card};
pub use pool::{Draw, DrawPool, draw_order};
pub use win::{Evaluation, Marks, Stage, evaluate, mark_card};
pub use state::{
    Award, ClaimOutcome, DrawOutcome, GameSession, Player, SessionError, SessionStatus, Winners,
};
pub use events::{GameEvent, GameEventData};
