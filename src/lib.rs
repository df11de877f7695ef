//! # Tombala
//!
//! Seeded Tombala (Turkish bingo) engine with an IRC bot in front of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TOMBALA                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── rng.rs      - Seeded MINSTD generator                  │
//! │  └── hash.rs     - State hashing and SHA-256 digests        │
//! │                                                             │
//! │  game/           - Game logic (deterministic)               │
//! │  ├── card.rs     - 3x9 card layout and generation           │
//! │  ├── pool.rs     - Shuffled 1..=90 draw pool                │
//! │  ├── win.rs      - Çinko / tombala evaluation               │
//! │  ├── state.rs    - Per-channel session state machine        │
//! │  └── events.rs   - Events emitted by a session              │
//! │                                                             │
//! │  network/        - Chat glue (non-deterministic)            │
//! │  ├── protocol.rs - Commands, wire events, UI snapshot       │
//! │  ├── session.rs  - Session registry and command routing     │
//! │  ├── scheduler.rs- Auto-draw timers                         │
//! │  ├── mirror.rs   - Client-side state mirror                 │
//! │  ├── irc.rs      - IRC line codec and operator tracking     │
//! │  └── server.rs   - IRC bot loop                             │
//! │                                                             │
//! │  proof/          - Fairness proofs                          │
//! │  ├── commitment.rs - Seed commit and reveal                 │
//! │  ├── transcript.rs - Record of one game                     │
//! │  └── verify.rs   - Replay verification                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Game outcomes in `core/` and `game/` are **fully deterministic**:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time in cards, draws or awards
//! - All randomness from one seeded MINSTD stream per session
//!
//! Given the same seed and the same join order, every card and every
//! draw is identical on any platform. Only the session instance id is
//! random (a v4 UUID); it never feeds the state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod proof;

// Re-export commonly used types
pub use core::rng::SeededRng;
pub use game::card::{Card, CardError, generate_card};
pub use game::pool::{DrawPool, draw_order};
pub use game::win::{Evaluation, Stage, evaluate};
pub use game::state::{GameSession, SessionStatus, Winners};
pub use network::session::{GameConfig, SessionManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default auto-draw interval (milliseconds)
pub const DEFAULT_DRAW_INTERVAL_MS: u64 = 30_000;
