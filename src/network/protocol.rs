//! Protocol Messages
//!
//! Chat-facing formats: the `!tombala` command grammar, the
//! `!tombala-event <json>` lines a bot publishes for client mirrors, and the
//! UI snapshot a display panel renders.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::game::card::{Card, COLS};
use crate::game::state::{GameSession, SessionStatus, Winners};
use crate::game::win::mark_card;

/// Prefix of every chat command.
pub const COMMAND_PREFIX: &str = "!tombala";

/// Prefix of published event lines.
pub const EVENT_PREFIX: &str = "!tombala-event";

// =============================================================================
// INBOUND COMMANDS
// =============================================================================

/// A parsed `!tombala` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `yardim`, or anything unrecognized.
    Help,
    /// `baslat`: open a fresh session for registration.
    Open,
    /// `katil`: register the sender.
    Join,
    /// `basla`: start drawing.
    Start,
    /// `cek`: draw one number now.
    Draw,
    /// `seed [value]`: reseed; `None` picks an automatic seed.
    Seed(Option<String>),
    /// `durum`: status line.
    Status,
    /// `kazan`: claim a win.
    Claim,
    /// `bitir`: end the game.
    End,
}

impl Command {
    /// Parse a chat line.
    ///
    /// Returns `None` when the line is not addressed to the game. A bare
    /// prefix or an unknown subcommand yields [`Command::Help`].
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let prefix = parts.next()?;
        if !prefix.eq_ignore_ascii_case(COMMAND_PREFIX) {
            return None;
        }

        let Some(sub) = parts.next() else {
            return Some(Command::Help);
        };

        let command = match sub.to_lowercase().as_str() {
            "yardim" => Command::Help,
            "baslat" => Command::Open,
            "katil" => Command::Join,
            "basla" => Command::Start,
            "cek" => Command::Draw,
            "seed" => {
                let value = parts.collect::<Vec<_>>().join(" ");
                Command::Seed(Some(value).filter(|v| !v.is_empty()))
            }
            "durum" => Command::Status,
            "kazan" => Command::Claim,
            "bitir" => Command::End,
            _ => Command::Help,
        };
        Some(command)
    }

    /// Subcommand keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Help => "yardim",
            Command::Open => "baslat",
            Command::Join => "katil",
            Command::Start => "basla",
            Command::Draw => "cek",
            Command::Seed(_) => "seed",
            Command::Status => "durum",
            Command::Claim => "kazan",
            Command::End => "bitir",
        }
    }

    /// Whether only channel operators may run this command.
    pub fn is_restricted(&self, restrict_draw: bool) -> bool {
        match self {
            Command::Open | Command::Start | Command::End | Command::Seed(_) => true,
            Command::Draw => restrict_draw,
            _ => false,
        }
    }
}

/// One-line usage summary.
pub fn help_text() -> String {
    [
        "!tombala yardim",
        "!tombala baslat",
        "!tombala katil",
        "!tombala basla",
        "!tombala cek",
        "!tombala seed <string>",
        "!tombala durum",
        "!tombala kazan",
        "!tombala bitir",
    ]
    .join(" | ")
}

/// A command with the context the transport resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Channel the command was sent to.
    pub channel: String,
    /// Sender nick.
    pub nick: String,
    /// Whether the sender may run restricted commands.
    pub is_operator: bool,
    /// The command.
    pub command: Command,
}

impl Inbound {
    /// Parse `text` as a command from `nick` in `channel`.
    pub fn parse(channel: &str, nick: &str, is_operator: bool, text: &str) -> Option<Self> {
        Command::parse(text).map(|command| Self {
            channel: channel.to_owned(),
            nick: nick.to_owned(),
            is_operator,
            command,
        })
    }
}

// =============================================================================
// PUBLISHED EVENTS
// =============================================================================

/// Events published to chat for client mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TombalaEvent {
    /// A number was drawn.
    Draw {
        number: u8,
    },

    /// Full public state of the channel's game.
    State {
        status: SessionStatus,
        #[serde(rename = "drawnNumbers")]
        drawn_numbers: Vec<u8>,
        winners: Winners,
    },

    /// A player's card.
    Card {
        nick: String,
        card: Card,
    },

    /// Previous game discarded; mirrors drop everything.
    Reset,
}

impl TombalaEvent {
    /// Public state of `session`.
    pub fn state_of(session: &GameSession) -> Self {
        TombalaEvent::State {
            status: session.status(),
            drawn_numbers: session.drawn().to_vec(),
            winners: session.winners().clone(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Chat line carrying this event.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{} {}", EVENT_PREFIX, self.to_json()?))
    }

    /// Parse a chat line. `Ok(None)` when the line is not an event line.
    pub fn from_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        let Some(payload) = line.strip_prefix(EVENT_PREFIX) else {
            return Ok(None);
        };
        if !payload.starts_with(char::is_whitespace) {
            return Ok(None);
        }
        Self::from_json(payload.trim()).map(Some)
    }
}

// =============================================================================
// UI SNAPSHOT
// =============================================================================

/// What a display panel shows for one nick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub status: SessionStatus,
    pub has_card: bool,
    /// The nick's card, or an all-empty grid.
    pub card: Card,
    /// Drawn numbers on the card, row-major.
    pub marked_numbers: Vec<u8>,
    /// Per-cell marks; empty without a card.
    pub marks: Vec<[bool; COLS]>,
    pub drawn_numbers: Vec<u8>,
    pub winners: Winners,
}

impl UiSnapshot {
    /// Build a snapshot from public state and an optional card.
    pub fn build(status: SessionStatus, card: Option<&Card>, drawn: &[u8], winners: &Winners) -> Self {
        let drawn_set: BTreeSet<u8> = drawn.iter().copied().collect();

        let (marked_numbers, marks) = match card {
            Some(card) => (
                card.numbers().filter(|n| drawn_set.contains(n)).collect(),
                mark_card(card, &drawn_set).to_vec(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            status,
            has_card: card.is_some(),
            card: card.cloned().unwrap_or_default(),
            marked_numbers,
            marks,
            drawn_numbers: drawn.to_vec(),
            winners: winners.clone(),
        }
    }

    /// Snapshot of `session` as seen by `nick`.
    pub fn of_session(session: &GameSession, nick: &str) -> Self {
        let card = session.player(nick).map(|p| &p.card);
        Self::build(session.status(), card, session.drawn(), session.winners())
    }

    /// Snapshot for a channel without a game.
    pub fn idle() -> Self {
        Self::build(SessionStatus::Idle, None, &[], &Winners::default())
    }
}

/// `durum` reply for `session`.
pub fn status_text(session: &GameSession) -> String {
    let last = session
        .last_drawn()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Durum: {} | Oyuncu: {} | Çekilen: {} | Son: {}",
        session.status(),
        session.player_count(),
        session.drawn().len(),
        last,
    )
}

// =============================================================================
// TESTS
// =============================================================================
