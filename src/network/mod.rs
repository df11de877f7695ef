//! Network Layer
//!
//! Chat glue around the game engine: command parsing, the per-channel
//! session registry, auto-draw timers and the IRC bot.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod irc;
pub mod mirror;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod session;

pub use irc::{IrcConfig, IrcMessage, OperatorTracker};
pub use mirror::StateMirror;
pub use protocol::{Command, Inbound, TombalaEvent, UiSnapshot, COMMAND_PREFIX, EVENT_PREFIX};
pub use scheduler::{DrawScheduler, ManualScheduler, TimerKey, TokioScheduler};
pub use server::{BotError, TombalaBot};
pub use session::{ConfigError, GameConfig, Outbound, Outgoing, SessionManager};
