//! Game Session State
//!
//! One channel's game: lifecycle, roster, draw history and winners.
//! Uses BTreeMap for deterministic iteration order.
//!
//! ```text
//! idle ──open──▶ registering ──start──▶ running ──tombala / exhaustion──▶ finished
//!   └───────────────── reseed (any state) ──▶ registering ◀──────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::SeededRng;
use crate::game::card::{generate_card, Card, CardError};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::pool::{Draw, DrawPool};
use crate::game::win::{evaluate, Evaluation, Stage};

// =============================================================================
// STATUS
// =============================================================================

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, nothing opened yet.
    #[default]
    Idle,
    /// Accepting players.
    Registering,
    /// Numbers are being drawn.
    Running,
    /// Tombala won, pool exhausted, or ended by an operator.
    Finished,
}

impl SessionStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Registering => "registering",
            SessionStatus::Running => "running",
            SessionStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PLAYERS & WINNERS
// =============================================================================

/// Stages a player has been awarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub cinko1: bool,
    pub cinko2: bool,
    pub tombala: bool,
}

impl Claims {
    /// Whether `stage` was awarded to this player.
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::Cinko1 => self.cinko1,
            Stage::Cinko2 => self.cinko2,
            Stage::Tombala => self.tombala,
        }
    }

    fn set(&mut self, stage: Stage) {
        match stage {
            Stage::Cinko1 => self.cinko1 = true,
            Stage::Cinko2 => self.cinko2 = true,
            Stage::Tombala => self.tombala = true,
        }
    }
}

/// A registered player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Nick as given at registration.
    pub nick: String,
    /// Dealt card.
    pub card: Card,
    /// Stages won.
    pub claims: Claims,
    /// Join order; cards are dealt in this order.
    pub join_index: u32,
}

/// Winners per stage.
///
/// Lists hold at most one nick while single-winner policy is in force.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winners {
    pub cinko1: Vec<String>,
    pub cinko2: Vec<String>,
    pub tombala: Vec<String>,
}

impl Winners {
    /// Winners of `stage`, in award order.
    pub fn get(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Cinko1 => &self.cinko1,
            Stage::Cinko2 => &self.cinko2,
            Stage::Tombala => &self.tombala,
        }
    }

    /// First winner of `stage`.
    pub fn first(&self, stage: Stage) -> Option<&str> {
        self.get(stage).first().map(String::as_str)
    }

    /// Whether anyone has won `stage`.
    pub fn is_taken(&self, stage: Stage) -> bool {
        !self.get(stage).is_empty()
    }

    pub(crate) fn push(&mut self, stage: Stage, nick: String) {
        match stage {
            Stage::Cinko1 => self.cinko1.push(nick),
            Stage::Cinko2 => self.cinko2.push(nick),
            Stage::Tombala => self.tombala.push(nick),
        }
    }
}

/// An award, with the number of draws made when it was granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub stage: Stage,
    pub nick: String,
    pub draw_count: usize,
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a registration.
#[derive(Debug)]
pub struct Registration<'a> {
    /// The registered player.
    pub player: &'a Player,
    /// False when the nick was already registered; the card is unchanged.
    pub created: bool,
}

/// Result of [`GameSession::draw_number`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Number drawn and recorded.
    Drawn(u8),
    /// Pool empty; the session is now finished.
    Exhausted,
    /// Session is not running; nothing changed.
    NotRunning(SessionStatus),
}

/// Result of [`GameSession::verify_claim`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Stage awarded to the claimant.
    Awarded {
        stage: Stage,
        evaluation: Evaluation,
    },
    /// Card qualifies for no open stage; nothing changed.
    NoWin {
        evaluation: Evaluation,
    },
    /// Claimant holds no card.
    NotRegistered,
    /// Nothing has been drawn in this session state.
    NotStarted(SessionStatus),
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Registration is closed in this state.
    #[error("registration closed while {0}")]
    RegistrationClosed(SessionStatus),

    /// Action not allowed in this state.
    #[error("invalid session state: {0}")]
    InvalidState(SessionStatus),

    /// Starting needs at least one player.
    #[error("no players registered")]
    NoPlayers,

    /// Player not found.
    #[error("player {0} is not registered")]
    NotRegistered(String),

    /// Card construction fault.
    #[error(transparent)]
    Card(#[from] CardError),
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// One channel's game.
#[derive(Clone, Debug)]
pub struct GameSession {
    /// Instance identifier; changes whenever the session object is replaced.
    id: Uuid,
    channel: String,
    status: SessionStatus,
    seed: String,
    rng: SeededRng,
    pool: DrawPool,
    drawn: Vec<u8>,
    drawn_set: BTreeSet<u8>,
    /// Keyed by lowercase nick.
    players: BTreeMap<String, Player>,
    next_join_index: u32,
    winners: Winners,
    awards: Vec<Award>,
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Create an idle session. The pool is shuffled from `seed` immediately.
    pub fn new(channel: impl Into<String>, seed: &str) -> Self {
        let mut rng = SeededRng::new(seed);
        let pool = DrawPool::shuffled(&mut rng);

        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            status: SessionStatus::Idle,
            seed: seed.to_owned(),
            rng,
            pool,
            drawn: Vec::new(),
            drawn_set: BTreeSet::new(),
            players: BTreeMap::new(),
            next_join_index: 0,
            winners: Winners::default(),
            awards: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Create a session already accepting players.
    pub fn open(channel: impl Into<String>, seed: &str) -> Self {
        let mut session = Self::new(channel, seed);
        session.transition(SessionStatus::Registering);
        session
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Instance identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Channel this session belongs to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Seed of the current game.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Numbers drawn so far, in order.
    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    /// Numbers drawn so far, as a set.
    pub fn drawn_set(&self) -> &BTreeSet<u8> {
        &self.drawn_set
    }

    /// Most recent draw.
    pub fn last_drawn(&self) -> Option<u8> {
        self.drawn.last().copied()
    }

    /// Numbers still in the pool.
    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    /// Winners record.
    pub fn winners(&self) -> &Winners {
        &self.winners
    }

    /// Awards in the order they were granted.
    pub fn awards(&self) -> &[Award] {
        &self.awards
    }

    /// Look up a player by nick (case-insensitive).
    pub fn player(&self, nick: &str) -> Option<&Player> {
        self.players.get(&nick_key(nick))
    }

    /// Registered player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players in join order.
    pub fn roster(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.join_index);
        players
    }

    /// Drain recorded events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Register `nick` and deal a card.
    ///
    /// Idempotent: an existing registration is returned untouched.
    /// Allowed while idle or registering.
    pub fn register_player(&mut self, nick: &str) -> Result<Registration<'_>, SessionError> {
        if !matches!(self.status, SessionStatus::Idle | SessionStatus::Registering) {
            return Err(SessionError::RegistrationClosed(self.status));
        }

        let key = nick_key(nick);
        let created = !self.players.contains_key(&key);

        if created {
            let card = generate_card(&mut self.rng)?;
            let player = Player {
                nick: nick.to_owned(),
                card,
                claims: Claims::default(),
                join_index: self.next_join_index,
            };
            self.next_join_index += 1;
            self.players.insert(key.clone(), player);
            self.record(GameEventData::PlayerJoined { nick: nick.to_owned() });
        }

        let player = self
            .players
            .get(&key)
            .ok_or_else(|| SessionError::NotRegistered(nick.to_owned()))?;

        Ok(Registration { player, created })
    }

    /// Begin drawing. Requires registering status and at least one player.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Registering {
            return Err(SessionError::InvalidState(self.status));
        }
        if self.players.is_empty() {
            return Err(SessionError::NoPlayers);
        }

        self.transition(SessionStatus::Running);
        Ok(())
    }

    /// End the game. Idempotent.
    pub fn finish(&mut self) {
        self.transition(SessionStatus::Finished);
    }

    /// Replace the seed.
    ///
    /// Clears draws and winners, reshuffles the pool and redeals every card in
    /// join order, keeping the roster. The session returns to registering.
    /// Nothing changes if a card cannot be built.
    pub fn reseed(&mut self, seed: &str) -> Result<(), SessionError> {
        let mut rng = SeededRng::new(seed);
        let pool = DrawPool::shuffled(&mut rng);

        let mut redealt = Vec::with_capacity(self.players.len());
        for player in self.roster() {
            redealt.push((nick_key(&player.nick), generate_card(&mut rng)?));
        }

        for (key, card) in redealt {
            if let Some(player) = self.players.get_mut(&key) {
                player.card = card;
                player.claims = Claims::default();
            }
        }

        self.seed = seed.to_owned();
        self.rng = rng;
        self.pool = pool;
        self.drawn.clear();
        self.drawn_set.clear();
        self.winners = Winners::default();
        self.awards.clear();

        self.record(GameEventData::Reseeded { seed: seed.to_owned() });
        self.transition(SessionStatus::Registering);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Play
    // -------------------------------------------------------------------------

    /// Draw the next number.
    ///
    /// An empty pool finishes the session and reports [`DrawOutcome::Exhausted`].
    pub fn draw_number(&mut self) -> DrawOutcome {
        if self.status != SessionStatus::Running {
            return DrawOutcome::NotRunning(self.status);
        }

        match self.pool.draw_next() {
            Draw::Number(number) => {
                self.drawn.push(number);
                self.drawn_set.insert(number);
                self.record(GameEventData::NumberDrawn { number });
                DrawOutcome::Drawn(number)
            }
            Draw::Exhausted => {
                self.record(GameEventData::PoolExhausted);
                self.transition(SessionStatus::Finished);
                DrawOutcome::Exhausted
            }
        }
    }

    /// Evaluate a player's card against the draws so far.
    pub fn evaluate_player(&self, nick: &str) -> Option<Evaluation> {
        self.player(nick).map(|p| evaluate(&p.card, &self.drawn_set))
    }

    /// Check a claim and award the highest open stage the card qualifies for.
    ///
    /// Stages are tried tombala, then çinko 2, then çinko 1. With
    /// `single_winner_per_stage` a stage already won by anyone is closed;
    /// otherwise only stages the claimant already holds are skipped.
    /// A tombala award finishes the session.
    pub fn verify_claim(&mut self, nick: &str, single_winner_per_stage: bool) -> ClaimOutcome {
        if matches!(self.status, SessionStatus::Idle | SessionStatus::Registering) {
            return ClaimOutcome::NotStarted(self.status);
        }

        let key = nick_key(nick);
        let Some(player) = self.players.get(&key) else {
            return ClaimOutcome::NotRegistered;
        };

        let evaluation = evaluate(&player.card, &self.drawn_set);
        let open = |stage: Stage| {
            if single_winner_per_stage {
                !self.winners.is_taken(stage)
            } else {
                !player.claims.has(stage)
            }
        };

        let Some(stage) = Stage::BY_PRIORITY
            .into_iter()
            .find(|&stage| evaluation.qualifies(stage) && open(stage))
        else {
            return ClaimOutcome::NoWin { evaluation };
        };

        let display = player.nick.clone();
        if let Some(player) = self.players.get_mut(&key) {
            player.claims.set(stage);
        }
        self.winners.push(stage, display.clone());
        self.awards.push(Award {
            stage,
            nick: display.clone(),
            draw_count: self.drawn.len(),
        });
        self.record(GameEventData::StageAwarded { stage, nick: display });

        if stage == Stage::Tombala {
            self.transition(SessionStatus::Finished);
        }

        ClaimOutcome::Awarded { stage, evaluation }
    }

    /// Hash of seed, draws, cards and winners.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(&self.seed, &self.drawn, |hasher| {
            for player in self.roster() {
                hasher.write_str(&player.nick);
                hasher.write_cells(player.card.rows().iter().flatten().copied());
            }
            for stage in Stage::BY_PRIORITY {
                hasher.write_strs(self.winners.get(stage));
            }
        })
    }

    // -------------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------------

    fn transition(&mut self, to: SessionStatus) {
        if self.status != to {
            let from = self.status;
            self.status = to;
            self.record(GameEventData::StatusChanged { from, to });
        }
    }

    fn record(&mut self, data: GameEventData) {
        self.events.push(GameEvent::new(self.drawn.len(), data));
    }
}

/// Case-insensitive player key.
pub fn nick_key(nick: &str) -> String {
    nick.to_lowercase()
}

// =============================================================================
// TESTS
// =============================================================================
