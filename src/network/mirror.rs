//! Client State Mirror
//!
//! Rebuilds a channel's game from the published `!tombala-event` lines, for
//! a client that only watches chat and renders a panel for its own nick.

use tracing::debug;

use crate::game::card::Card;
use crate::game::state::{SessionStatus, Winners};
use crate::network::protocol::{TombalaEvent, UiSnapshot};

/// Client-side copy of one channel's public game state.
#[derive(Debug, Clone)]
pub struct StateMirror {
    local_nick: String,
    status: SessionStatus,
    drawn: Vec<u8>,
    winners: Winners,
    card: Option<Card>,
}

impl StateMirror {
    /// Mirror for `local_nick`.
    pub fn new(local_nick: impl Into<String>) -> Self {
        Self {
            local_nick: local_nick.into(),
            status: SessionStatus::Idle,
            drawn: Vec::new(),
            winners: Winners::default(),
            card: None,
        }
    }

    /// Nick whose card is tracked.
    pub fn local_nick(&self) -> &str {
        &self.local_nick
    }

    /// Follow a nick change of the local user.
    pub fn rename(&mut self, new_nick: impl Into<String>) {
        self.local_nick = new_nick.into();
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &TombalaEvent) {
        match event {
            TombalaEvent::Draw { number } => {
                if !self.drawn.contains(number) {
                    self.drawn.push(*number);
                }
            }
            TombalaEvent::State { status, drawn_numbers, winners } => {
                self.status = *status;
                self.drawn = drawn_numbers.clone();
                self.winners = winners.clone();
            }
            TombalaEvent::Card { nick, card } => {
                if nick.to_lowercase() == self.local_nick.to_lowercase() {
                    self.card = Some(card.clone());
                }
            }
            TombalaEvent::Reset => {
                *self = Self::new(std::mem::take(&mut self.local_nick));
            }
        }
    }

    /// Apply a chat line. Returns whether it carried an event.
    pub fn apply_line(&mut self, line: &str) -> bool {
        match TombalaEvent::from_line(line) {
            Ok(Some(event)) => {
                self.apply(&event);
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, "Malformed event line ignored");
                false
            }
        }
    }

    /// Panel snapshot.
    pub fn snapshot(&self) -> UiSnapshot {
        UiSnapshot::build(self.status, self.card.as_ref(), &self.drawn, &self.winners)
    }
}
