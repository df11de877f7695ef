//! Session Management
//!
//! Maps channels to their games, routes chat commands, enforces the operator
//! policy and drives auto-draw through a [`DrawScheduler`].
//!
//! The manager is single-writer: the owner calls [`SessionManager::handle`]
//! and [`SessionManager::on_tick`] from one task, so sessions need no locks.

use std::collections::BTreeMap;
use std::time::Duration;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::game::events::GameEventData;
use crate::game::state::{ClaimOutcome, DrawOutcome, GameSession, SessionError, SessionStatus};
use crate::game::win::Stage;
use crate::network::protocol::{help_text, status_text, Command, Inbound, TombalaEvent, UiSnapshot};
use crate::network::scheduler::{DrawScheduler, TimerKey};
use crate::proof::commitment::{SeedCommitment, SeedReveal};
use crate::proof::transcript::GameTranscript;
use crate::DEFAULT_DRAW_INTERVAL_MS;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required variable not set.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// Variable set to an unusable value.
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Read a boolean setting (`true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`).
pub(crate) fn lookup_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}

/// Read a numeric setting.
pub(crate) fn lookup_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Split a comma-separated list, dropping blanks.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Game policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Auto-draw period.
    pub draw_interval: Duration,
    /// Each stage can be won by one player only.
    pub single_winner_per_stage: bool,
    /// `cek` needs operator rights.
    pub restrict_draw: bool,
    /// `seed` is accepted while drawing.
    pub allow_running_reseed: bool,
    /// Channels the game answers in; empty means all.
    pub allowed_channels: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            draw_interval: Duration::from_millis(DEFAULT_DRAW_INTERVAL_MS),
            single_winner_per_stage: true,
            restrict_draw: false,
            allow_running_reseed: false,
            allowed_channels: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Load from environment variables.
    ///
    /// `TOMBALA_INTERVAL_MS`, `TOMBALA_SINGLE_WINNER`, `TOMBALA_RESTRICT_DRAW`,
    /// `TOMBALA_ALLOW_RUNNING_RESEED`; unset values keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let interval_ms = lookup_number(&lookup, "TOMBALA_INTERVAL_MS", DEFAULT_DRAW_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "TOMBALA_INTERVAL_MS",
                value: interval_ms.to_string(),
            });
        }

        Ok(Self {
            draw_interval: Duration::from_millis(interval_ms),
            single_winner_per_stage: lookup_bool(
                &lookup,
                "TOMBALA_SINGLE_WINNER",
                defaults.single_winner_per_stage,
            )?,
            restrict_draw: lookup_bool(&lookup, "TOMBALA_RESTRICT_DRAW", defaults.restrict_draw)?,
            allow_running_reseed: lookup_bool(
                &lookup,
                "TOMBALA_ALLOW_RUNNING_RESEED",
                defaults.allow_running_reseed,
            )?,
            allowed_channels: defaults.allowed_channels,
        })
    }

    /// Restrict the game to `channels`.
    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.allowed_channels = channels;
        self
    }

    /// Whether the game answers in `channel`.
    pub fn allows_channel(&self, channel: &str) -> bool {
        self.allowed_channels.is_empty()
            || self.allowed_channels.iter().any(|c| c.eq_ignore_ascii_case(channel))
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Sink for everything the manager says.
pub trait Outbound {
    /// Plain text reply to the channel.
    fn reply(&mut self, channel: &str, text: &str);

    /// A number was drawn.
    fn announce_draw(&mut self, channel: &str, number: u8);

    /// Machine-readable event for client mirrors.
    fn publish(&mut self, channel: &str, event: &TombalaEvent) {
        let _ = (channel, event);
    }
}

/// A message produced by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Outgoing {
    Reply { channel: String, text: String },
    Draw { channel: String, number: u8 },
    Event { channel: String, event: TombalaEvent },
}

impl Outgoing {
    /// Target channel.
    pub fn channel(&self) -> &str {
        match self {
            Outgoing::Reply { channel, .. }
            | Outgoing::Draw { channel, .. }
            | Outgoing::Event { channel, .. } => channel,
        }
    }
}

/// Collects messages for sending after the manager returns.
impl Outbound for Vec<Outgoing> {
    fn reply(&mut self, channel: &str, text: &str) {
        self.push(Outgoing::Reply { channel: channel.to_owned(), text: text.to_owned() });
    }

    fn announce_draw(&mut self, channel: &str, number: u8) {
        self.push(Outgoing::Draw { channel: channel.to_owned(), number });
    }

    fn publish(&mut self, channel: &str, event: &TombalaEvent) {
        self.push(Outgoing::Event { channel: channel.to_owned(), event: event.clone() });
    }
}

// =============================================================================
// REPLY TEXTS
// =============================================================================

const NOT_OPERATOR: &str = "Bu komut sadece kanal operatörleri tarafından kullanılabilir.";
const OPENED: &str = "Tombala oturumu açıldı. Katılmak için: !tombala katil";
const JOIN_NOT_OPEN: &str = "Önce operatör !tombala baslat ile oyunu açmalı.";
const START_NOT_REGISTERING: &str = "Önce !tombala baslat ile kayıt açılmalı.";
const START_NO_PLAYERS: &str = "Başlatmak için en az bir oyuncu katılmalı (!tombala katil).";
const DRAW_NOT_RUNNING: &str = "Çekiliş için oyun running durumunda olmalı.";
const EXHAUSTED: &str = "Tüm sayılar çekildi. Oyun bitti.";
const CLAIM_NOT_STARTED: &str = "Henüz başlatılmış bir oyun yok.";
const SEED_WHILE_RUNNING: &str = "Oyun sürerken seed değiştirilemez.";
const ENDED: &str = "Oyun sonlandırıldı ve temizlendi.";
const CARD_FAULT: &str = "Kart oluşturulamadı, lütfen tekrar deneyin.";

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Owns every channel's game.
pub struct SessionManager<S: DrawScheduler> {
    /// Keyed by lowercase channel name.
    sessions: BTreeMap<String, GameSession>,
    config: GameConfig,
    scheduler: S,
}

impl<S: DrawScheduler> SessionManager<S> {
    /// Create a manager.
    pub fn new(config: GameConfig, scheduler: S) -> Self {
        Self {
            sessions: BTreeMap::new(),
            config,
            scheduler,
        }
    }

    /// Game policy.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Timer owner.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Session of `channel`, if one exists.
    pub fn session(&self, channel: &str) -> Option<&GameSession> {
        self.sessions.get(&channel_key(channel))
    }

    /// Number of channels with a session.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Panel snapshot of `channel` for `nick`.
    pub fn ui_state(&self, channel: &str, nick: &str) -> UiSnapshot {
        self.session(channel)
            .map(|session| UiSnapshot::of_session(session, nick))
            .unwrap_or_else(UiSnapshot::idle)
    }

    /// Transcript of `channel`'s current game.
    pub fn transcript(&self, channel: &str) -> Option<GameTranscript> {
        self.session(channel)
            .map(|session| GameTranscript::from_session(session, self.config.single_winner_per_stage))
    }

    /// Route one command. Returns false when the channel is not served.
    pub fn handle<O: Outbound>(&mut self, inbound: &Inbound, out: &mut O) -> bool {
        let channel = inbound.channel.as_str();
        if !self.config.allows_channel(channel) {
            debug!(channel, "Ignoring command outside allowed channels");
            return false;
        }

        if inbound.command.is_restricted(self.config.restrict_draw) && !inbound.is_operator {
            debug!(channel, nick = %inbound.nick, command = inbound.command.keyword(), "Restricted command rejected");
            out.reply(channel, NOT_OPERATOR);
            return true;
        }

        match &inbound.command {
            Command::Help => out.reply(channel, &help_text()),
            Command::Open => self.open(channel, out),
            Command::Join => self.join(channel, &inbound.nick, out),
            Command::Start => self.start(channel, out),
            Command::Draw => self.draw(channel, true, out),
            Command::Seed(seed) => self.reseed(channel, seed.as_deref(), out),
            Command::Status => {
                let text = status_text(self.session_mut(channel));
                out.reply(channel, &text);
            }
            Command::Claim => self.claim(channel, &inbound.nick, out),
            Command::End => self.end(channel, out),
        }

        self.flush(channel, out);
        true
    }

    /// Handle an auto-draw tick. Ticks from a cancelled timer or a replaced
    /// session are dropped.
    pub fn on_tick<O: Outbound>(&mut self, key: &TimerKey, out: &mut O) {
        let armed = self.scheduler.active(&key.channel) == Some(key);
        let live = self
            .sessions
            .get(&key.channel)
            .filter(|s| s.id() == key.session_id && s.status() == SessionStatus::Running)
            .map(|s| s.channel().to_owned());

        match (armed, live) {
            (true, Some(channel)) => {
                self.draw(&channel, false, out);
                self.flush(&channel, out);
            }
            (true, None) => {
                debug!(channel = %key.channel, "Timer outlived its session; cancelling");
                self.scheduler.cancel(&key.channel);
            }
            (false, _) => {
                debug!(channel = %key.channel, "Stale draw tick ignored");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    fn open<O: Outbound>(&mut self, channel: &str, out: &mut O) {
        let key = channel_key(channel);
        self.scheduler.cancel(&key);

        let session = GameSession::open(channel, &auto_seed(channel));
        info!(channel, session = %session.id(), "Session opened");
        self.sessions.insert(key, session);

        out.publish(channel, &TombalaEvent::Reset);
        out.reply(channel, OPENED);
    }

    fn join<O: Outbound>(&mut self, channel: &str, nick: &str, out: &mut O) {
        let session = self.session_mut(channel);
        if matches!(session.status(), SessionStatus::Idle | SessionStatus::Finished) {
            out.reply(channel, JOIN_NOT_OPEN);
            return;
        }

        let (player, created) = match session.register_player(nick) {
            Ok(registration) => (registration.player.clone(), registration.created),
            Err(SessionError::RegistrationClosed(_)) => {
                out.reply(channel, &format!("{nick}: Kayıt aşaması kapalı."));
                return;
            }
            Err(e) => {
                error!(channel, nick, error = %e, "Card generation failed");
                out.reply(channel, CARD_FAULT);
                return;
            }
        };

        let total = session.player_count();
        if created {
            info!(channel, nick = %player.nick, total, "Player joined");
        }
        out.publish(channel, &TombalaEvent::Card { nick: player.nick.clone(), card: player.card });
        out.reply(channel, &format!("{} oyuna katıldı. Toplam oyuncu: {}", player.nick, total));
    }

    fn start<O: Outbound>(&mut self, channel: &str, out: &mut O) {
        let session = self.session_mut(channel);
        match session.start() {
            Ok(()) => {
                let timer = TimerKey::new(channel_key(channel), session.id());
                let commitment = SeedCommitment::commit(session.seed());
                info!(channel, players = session.player_count(), commitment = %commitment.to_hex(), "Game started");

                let every = self.config.draw_interval;
                self.scheduler.schedule(timer, every);
                out.reply(channel, &format!("Oyun başladı. Otomatik çekiliş: {}ms", every.as_millis()));
                out.reply(channel, &format!("Seed taahhüdü (SHA-256): {}", commitment.to_hex()));
            }
            Err(SessionError::NoPlayers) => out.reply(channel, START_NO_PLAYERS),
            Err(e) => {
                debug!(channel, error = %e, "Start rejected");
                out.reply(channel, START_NOT_REGISTERING);
            }
        }
    }

    fn draw<O: Outbound>(&mut self, channel: &str, manual: bool, out: &mut O) {
        let session = self.session_mut(channel);
        match session.draw_number() {
            DrawOutcome::Drawn(number) => {
                debug!(channel, number, remaining = session.remaining(), "Number drawn");
                out.announce_draw(channel, number);
            }
            DrawOutcome::Exhausted => {
                let seed = session.seed().to_owned();
                info!(channel, "Pool exhausted; game finished");
                self.scheduler.cancel(&channel_key(channel));
                out.reply(channel, EXHAUSTED);
                reveal_seed(channel, &seed, out);
            }
            DrawOutcome::NotRunning(status) => {
                debug!(channel, %status, "Draw rejected");
                if manual {
                    out.reply(channel, DRAW_NOT_RUNNING);
                }
            }
        }
    }

    fn reseed<O: Outbound>(&mut self, channel: &str, seed: Option<&str>, out: &mut O) {
        let allow_running = self.config.allow_running_reseed;
        let session = self.session_mut(channel);
        let was_running = session.status() == SessionStatus::Running;
        if was_running && !allow_running {
            out.reply(channel, SEED_WHILE_RUNNING);
            return;
        }

        let previous = session.seed().to_owned();
        let value = seed.map(str::to_owned).unwrap_or_else(|| auto_seed(channel));
        if let Err(e) = session.reseed(&value) {
            error!(channel, error = %e, "Reseed failed");
            out.reply(channel, CARD_FAULT);
            return;
        }

        info!(channel, players = session.player_count(), "Session reseeded");
        self.scheduler.cancel(&channel_key(channel));
        if was_running {
            reveal_seed(channel, &previous, out);
        }
        out.reply(channel, &format!("Seed ayarlandı: {}", seed.unwrap_or("(otomatik)")));
    }

    fn claim<O: Outbound>(&mut self, channel: &str, nick: &str, out: &mut O) {
        let single_winner = self.config.single_winner_per_stage;
        let session = self.session_mut(channel);
        let was_running = session.status() == SessionStatus::Running;

        match session.verify_claim(nick, single_winner) {
            ClaimOutcome::NotStarted(_) => out.reply(channel, CLAIM_NOT_STARTED),
            ClaimOutcome::NotRegistered => {
                out.reply(channel, &format!("{nick} için kayıtlı kart bulunamadı."));
            }
            ClaimOutcome::NoWin { evaluation } => {
                debug!(channel, nick, matched = evaluation.matched_count, "Claim rejected");
                out.reply(channel, &format!("{nick} için geçerli bir kazanım bulunamadı."));
            }
            ClaimOutcome::Awarded { stage, .. } => {
                let winner = session
                    .player(nick)
                    .map(|p| p.nick.clone())
                    .unwrap_or_else(|| nick.to_owned());
                let seed = session.seed().to_owned();
                info!(channel, nick = %winner, stage = stage.key(), "Stage awarded");

                if stage == Stage::Tombala {
                    self.scheduler.cancel(&channel_key(channel));
                    out.reply(channel, &format!("🏆 {winner} TOMBALA yaptı!"));
                    if was_running {
                        reveal_seed(channel, &seed, out);
                    }
                } else {
                    out.reply(channel, &format!("🎉 {} {} kazandı!", winner, stage.label()));
                }
            }
        }
    }

    fn end<O: Outbound>(&mut self, channel: &str, out: &mut O) {
        self.scheduler.cancel(&channel_key(channel));

        let session = self.session_mut(channel);
        let was_running = session.status() == SessionStatus::Running;
        let seed = session.seed().to_owned();
        session.finish();
        info!(channel, "Game ended by operator");

        out.reply(channel, ENDED);
        if was_running {
            reveal_seed(channel, &seed, out);
        }
    }

    // -------------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------------

    /// Session of `channel`, created idle on first use.
    fn session_mut(&mut self, channel: &str) -> &mut GameSession {
        self.sessions
            .entry(channel_key(channel))
            .or_insert_with(|| GameSession::new(channel, &auto_seed(channel)))
    }

    /// Publish what changed since the last flush.
    fn flush<O: Outbound>(&mut self, channel: &str, out: &mut O) {
        let Some(session) = self.sessions.get_mut(&channel_key(channel)) else {
            return;
        };
        let events = session.take_events();
        if events.is_empty() {
            return;
        }

        for event in &events {
            match &event.data {
                GameEventData::NumberDrawn { number } => {
                    out.publish(channel, &TombalaEvent::Draw { number: *number });
                }
                GameEventData::Reseeded { .. } => {
                    for player in session.roster() {
                        out.publish(channel, &TombalaEvent::Card {
                            nick: player.nick.clone(),
                            card: player.card.clone(),
                        });
                    }
                }
                GameEventData::StatusChanged { from, to } => {
                    debug!(channel, %from, %to, "Status changed");
                }
                _ => {}
            }
        }
        out.publish(channel, &TombalaEvent::state_of(session));
    }
}

/// Map key for a channel; channel names are case-insensitive.
fn channel_key(channel: &str) -> String {
    channel.to_lowercase()
}

/// Seed used when none is given.
fn auto_seed(channel: &str) -> String {
    format!("{}:{}", channel, Utc::now().timestamp_millis())
}

fn reveal_seed<O: Outbound>(channel: &str, seed: &str, out: &mut O) {
    let reveal = SeedReveal::new(seed);
    debug!(channel, commitment = %reveal.commitment.to_hex(), "Seed revealed");
    out.reply(channel, &reveal.to_line());
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::scheduler::ManualScheduler;
    use crate::game::pool::draw_order;

    type Manager = SessionManager<ManualScheduler>;

    const CH: &str = "#test";

    fn manager() -> Manager {
        SessionManager::new(GameConfig::default(), ManualScheduler::new())
    }

    fn send(manager: &mut Manager, nick: &str, op: bool, text: &str) -> Vec<Outgoing> {
        let inbound = Inbound::parse(CH, nick, op, text).unwrap();
        let mut out = Vec::new();
        manager.handle(&inbound, &mut out);
        out
    }

    fn replies(out: &[Outgoing]) -> Vec<&str> {
        out.iter()
            .filter_map(|o| match o {
                Outgoing::Reply { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn draws(out: &[Outgoing]) -> Vec<u8> {
        out.iter()
            .filter_map(|o| match o {
                Outgoing::Draw { number, .. } => Some(*number),
                _ => None,
            })
            .collect()
    }

    fn events(out: &[Outgoing]) -> Vec<&TombalaEvent> {
        out.iter()
            .filter_map(|o| match o {
                Outgoing::Event { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    fn tick(manager: &mut Manager) -> Vec<Outgoing> {
        let key = manager.scheduler().fire(CH).expect("timer armed");
        let mut out = Vec::new();
        manager.on_tick(&key, &mut out);
        out
    }

    /// Open, seed, join the nicks and start.
    fn running(manager: &mut Manager, seed: &str, nicks: &[&str]) {
        send(manager, "op", true, "!tombala baslat");
        send(manager, "op", true, &format!("!tombala seed {seed}"));
        for nick in nicks {
            send(manager, nick, false, "!tombala katil");
        }
        send(manager, "op", true, "!tombala basla");
    }

    #[test]
    fn test_help() {
        let mut manager = manager();
        let out = send(&mut manager, "alice", false, "!tombala");
        assert_eq!(replies(&out), vec![help_text().as_str()]);
    }

    #[test]
    fn test_restricted_commands_need_operator() {
        let mut manager = manager();
        for text in ["!tombala baslat", "!tombala basla", "!tombala bitir", "!tombala seed x"] {
            let out = send(&mut manager, "alice", false, text);
            assert_eq!(replies(&out), vec![NOT_OPERATOR], "{text}");
        }
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn test_restrict_draw_policy() {
        let config = GameConfig { restrict_draw: true, ..GameConfig::default() };
        let mut manager = SessionManager::new(config, ManualScheduler::new());
        let out = send(&mut manager, "alice", false, "!tombala cek");
        assert_eq!(replies(&out), vec![NOT_OPERATOR]);

        let out = send(&mut manager, "op", true, "!tombala cek");
        assert_eq!(replies(&out), vec![DRAW_NOT_RUNNING]);
    }

    #[test]
    fn test_disallowed_channel_ignored() {
        let config = GameConfig::default().with_channels(vec!["#tombala".into()]);
        let mut manager = SessionManager::new(config, ManualScheduler::new());
        let inbound = Inbound::parse("#other", "op", true, "!tombala baslat").unwrap();
        let mut out = Vec::new();

        assert!(!manager.handle(&inbound, &mut out));
        assert!(out.is_empty());

        let inbound = Inbound::parse("#TOMBALA", "op", true, "!tombala baslat").unwrap();
        assert!(manager.handle(&inbound, &mut out));
    }

    #[test]
    fn test_join_requires_open_session() {
        let mut manager = manager();
        let out = send(&mut manager, "alice", false, "!tombala katil");
        assert_eq!(replies(&out), vec![JOIN_NOT_OPEN]);
    }

    #[test]
    fn test_open_and_join() {
        let mut manager = manager();
        let out = send(&mut manager, "op", true, "!tombala baslat");
        assert_eq!(replies(&out), vec![OPENED]);
        assert_eq!(events(&out)[0], &TombalaEvent::Reset);

        let out = send(&mut manager, "alice", false, "!tombala katil");
        assert_eq!(replies(&out), vec!["alice oyuna katıldı. Toplam oyuncu: 1"]);
        assert!(events(&out).iter().any(|e| matches!(e, TombalaEvent::Card { nick, .. } if nick == "alice")));

        let out = send(&mut manager, "bob", false, "!tombala katil");
        assert_eq!(replies(&out), vec!["bob oyuna katıldı. Toplam oyuncu: 2"]);
    }

    #[test]
    fn test_rejoin_keeps_card() {
        let mut manager = manager();
        send(&mut manager, "op", true, "!tombala baslat");
        send(&mut manager, "Alice", false, "!tombala katil");
        let card = manager.session(CH).unwrap().player("alice").unwrap().card.clone();

        let out = send(&mut manager, "alice", false, "!tombala katil");
        assert_eq!(replies(&out), vec!["Alice oyuna katıldı. Toplam oyuncu: 1"]);
        assert_eq!(manager.session(CH).unwrap().player("ALICE").unwrap().card, card);
    }

    #[test]
    fn test_start_rules() {
        let mut manager = manager();
        let out = send(&mut manager, "op", true, "!tombala basla");
        assert_eq!(replies(&out), vec![START_NOT_REGISTERING]);

        send(&mut manager, "op", true, "!tombala baslat");
        let out = send(&mut manager, "op", true, "!tombala basla");
        assert_eq!(replies(&out), vec![START_NO_PLAYERS]);
        assert_eq!(manager.scheduler().active_count(), 0);
    }

    #[test]
    fn test_start_arms_timer_and_commits() {
        let mut manager = manager();
        send(&mut manager, "op", true, "!tombala baslat");
        send(&mut manager, "op", true, "!tombala seed committed");
        send(&mut manager, "alice", false, "!tombala katil");
        let out = send(&mut manager, "op", true, "!tombala basla");

        let texts = replies(&out);
        assert_eq!(texts[0], "Oyun başladı. Otomatik çekiliş: 30000ms");
        assert_eq!(
            texts[1],
            format!("Seed taahhüdü (SHA-256): {}", SeedCommitment::commit("committed").to_hex())
        );
        assert_eq!(manager.scheduler().active_count(), 1);
        assert_eq!(manager.scheduler().interval(CH), Some(Duration::from_millis(30_000)));
        assert_eq!(manager.session(CH).unwrap().status(), SessionStatus::Running);
    }

    #[test]
    fn test_revealed_seed_opens_announced_commitment() {
        let mut manager = manager();
        send(&mut manager, "op", true, "!tombala baslat");
        send(&mut manager, "op", true, "!tombala seed fair");
        send(&mut manager, "alice", false, "!tombala katil");
        let started = send(&mut manager, "op", true, "!tombala basla");
        let announced = replies(&started)[1]
            .strip_prefix("Seed taahhüdü (SHA-256): ")
            .unwrap()
            .to_owned();
        let published = SeedCommitment::from_hex(&announced).unwrap();

        send(&mut manager, "alice", false, "!tombala cek");
        let ended = send(&mut manager, "op", true, "!tombala bitir");
        let reveal = SeedReveal::from_line(replies(&ended)[1]).unwrap();

        assert_eq!(reveal.verify(&published), Ok(()));
        assert_eq!(reveal.draw_order()[0], manager.session(CH).unwrap().drawn()[0]);
    }

    #[test]
    fn test_ticks_draw_in_seed_order() {
        let mut manager = manager();
        running(&mut manager, "fixed-seed", &["alice"]);

        let mut drawn = Vec::new();
        for _ in 0..5 {
            let out = tick(&mut manager);
            drawn.extend(draws(&out));
            assert!(events(&out).iter().any(|e| matches!(e, TombalaEvent::Draw { .. })));
        }
        assert_eq!(drawn, &draw_order("fixed-seed")[..5]);
    }

    #[test]
    fn test_manual_draw() {
        let mut manager = manager();
        let out = send(&mut manager, "alice", false, "!tombala cek");
        assert_eq!(replies(&out), vec![DRAW_NOT_RUNNING]);

        running(&mut manager, "manual", &["alice"]);
        let out = send(&mut manager, "alice", false, "!tombala cek");
        assert_eq!(draws(&out), vec![draw_order("manual")[0]]);
    }

    #[test]
    fn test_exhaustion_via_ticks() {
        let mut manager = manager();
        running(&mut manager, "drain", &["alice"]);

        for _ in 0..90 {
            assert_eq!(draws(&tick(&mut manager)).len(), 1);
        }
        let out = tick(&mut manager);
        let texts = replies(&out);
        assert_eq!(texts[0], EXHAUSTED);
        assert_eq!(texts[1], "Seed açıklandı: drain");
        assert_eq!(manager.session(CH).unwrap().status(), SessionStatus::Finished);
        assert_eq!(manager.scheduler().active_count(), 0);
    }

    #[test]
    fn test_status_text() {
        let mut manager = manager();
        running(&mut manager, "status", &["alice", "bob"]);
        send(&mut manager, "alice", false, "!tombala cek");

        let out = send(&mut manager, "bob", false, "!tombala durum");
        let last = draw_order("status")[0];
        assert_eq!(
            replies(&out),
            vec![format!("Durum: running | Oyuncu: 2 | Çekilen: 1 | Son: {last}").as_str()]
        );
    }

    #[test]
    fn test_claims() {
        let mut manager = manager();
        let out = send(&mut manager, "alice", false, "!tombala kazan");
        assert_eq!(replies(&out), vec![CLAIM_NOT_STARTED]);

        running(&mut manager, "claims", &["alice"]);
        let out = send(&mut manager, "mallory", false, "!tombala kazan");
        assert_eq!(replies(&out), vec!["mallory için kayıtlı kart bulunamadı."]);

        let out = send(&mut manager, "alice", false, "!tombala kazan");
        assert_eq!(replies(&out), vec!["alice için geçerli bir kazanım bulunamadı."]);
    }

    #[test]
    fn test_tombala_finishes_and_stops_timer() {
        let mut manager = manager();
        running(&mut manager, "winner", &["alice"]);

        while !manager.session(CH).unwrap().evaluate_player("alice").unwrap().tombala {
            tick(&mut manager);
        }
        let out = send(&mut manager, "alice", false, "!tombala kazan");
        let texts = replies(&out);
        assert_eq!(texts[0], "🏆 alice TOMBALA yaptı!");
        assert_eq!(texts[1], "Seed açıklandı: winner");
        assert_eq!(manager.session(CH).unwrap().status(), SessionStatus::Finished);
        assert_eq!(manager.scheduler().active_count(), 0);

        // Finished games still accept claims for open stages.
        let out = send(&mut manager, "alice", false, "!tombala kazan");
        assert_eq!(replies(&out), vec!["🎉 alice Çinko 2 kazandı!"]);
    }

    #[test]
    fn test_cinko_announcement() {
        let mut manager = manager();
        running(&mut manager, "cinko", &["alice"]);

        loop {
            let eval = manager.session(CH).unwrap().evaluate_player("alice").unwrap();
            if eval.cinko1 {
                let label = if eval.tombala {
                    return;
                } else if eval.cinko2 {
                    "Çinko 2"
                } else {
                    "Çinko 1"
                };
                let out = send(&mut manager, "alice", false, "!tombala kazan");
                assert_eq!(replies(&out), vec![format!("🎉 alice {label} kazandı!").as_str()]);
                assert_eq!(manager.session(CH).unwrap().status(), SessionStatus::Running);
                assert_eq!(manager.scheduler().active_count(), 1);
                return;
            }
            tick(&mut manager);
        }
    }

    #[test]
    fn test_stale_tick_after_end() {
        let mut manager = manager();
        running(&mut manager, "stale", &["alice"]);
        let key = manager.scheduler().fire(CH).unwrap();

        let out = send(&mut manager, "op", true, "!tombala bitir");
        assert_eq!(replies(&out), vec![ENDED, "Seed açıklandı: stale"]);
        assert_eq!(manager.scheduler().active_count(), 0);

        let mut out = Vec::new();
        manager.on_tick(&key, &mut out);
        assert!(out.is_empty());
        assert!(manager.session(CH).unwrap().drawn().is_empty());
    }

    #[test]
    fn test_stale_tick_after_reopen() {
        let mut manager = manager();
        running(&mut manager, "old", &["alice"]);
        let old_key = manager.scheduler().fire(CH).unwrap();

        running(&mut manager, "new", &["alice"]);
        let mut out = Vec::new();
        manager.on_tick(&old_key, &mut out);
        assert!(out.is_empty());

        let out = tick(&mut manager);
        assert_eq!(draws(&out), vec![draw_order("new")[0]]);
        assert_eq!(manager.scheduler().active_count(), 1);
    }

    #[test]
    fn test_reseed_regenerates_cards() {
        let mut manager = manager();
        send(&mut manager, "op", true, "!tombala baslat");
        send(&mut manager, "alice", false, "!tombala katil");
        send(&mut manager, "bob", false, "!tombala katil");

        let out = send(&mut manager, "op", true, "!tombala seed yeni seed");
        assert_eq!(replies(&out), vec!["Seed ayarlandı: yeni seed"]);
        let cards: Vec<_> = events(&out)
            .into_iter()
            .filter(|e| matches!(e, TombalaEvent::Card { .. }))
            .collect();
        assert_eq!(cards.len(), 2);

        let mut fresh = GameSession::open(CH, "yeni seed");
        fresh.register_player("alice").unwrap();
        fresh.register_player("bob").unwrap();
        let session = manager.session(CH).unwrap();
        assert_eq!(session.player("alice").unwrap().card, fresh.player("alice").unwrap().card);
        assert_eq!(session.player("bob").unwrap().card, fresh.player("bob").unwrap().card);
    }

    #[test]
    fn test_auto_seed() {
        let mut manager = manager();
        send(&mut manager, "op", true, "!tombala baslat");
        let out = send(&mut manager, "op", true, "!tombala seed");
        assert_eq!(replies(&out), vec!["Seed ayarlandı: (otomatik)"]);
        assert!(manager.session(CH).unwrap().seed().starts_with("#test:"));
    }

    #[test]
    fn test_reseed_while_running_policy() {
        let mut manager = manager();
        running(&mut manager, "locked", &["alice"]);
        let out = send(&mut manager, "op", true, "!tombala seed other");
        assert_eq!(replies(&out), vec![SEED_WHILE_RUNNING]);
        assert_eq!(manager.session(CH).unwrap().seed(), "locked");

        let config = GameConfig { allow_running_reseed: true, ..GameConfig::default() };
        let mut manager = SessionManager::new(config, ManualScheduler::new());
        running(&mut manager, "unlocked", &["alice"]);
        tick(&mut manager);

        let out = send(&mut manager, "op", true, "!tombala seed other");
        assert_eq!(replies(&out), vec!["Seed açıklandı: unlocked", "Seed ayarlandı: other"]);
        let session = manager.session(CH).unwrap();
        assert_eq!(session.status(), SessionStatus::Registering);
        assert!(session.drawn().is_empty());
        assert_eq!(manager.scheduler().active_count(), 0);
    }

    #[test]
    fn test_multi_winner_config() {
        let config = GameConfig { single_winner_per_stage: false, ..GameConfig::default() };
        let mut manager = SessionManager::new(config, ManualScheduler::new());
        running(&mut manager, "multi", &["alice", "bob"]);
        for _ in 0..90 {
            tick(&mut manager);
        }

        send(&mut manager, "alice", false, "!tombala kazan");
        let out = send(&mut manager, "bob", false, "!tombala kazan");
        assert_eq!(replies(&out), vec!["🏆 bob TOMBALA yaptı!"]);
        assert_eq!(manager.session(CH).unwrap().winners().get(Stage::Tombala).len(), 2);
    }

    #[test]
    fn test_ui_state() {
        let mut manager = manager();
        assert_eq!(manager.ui_state(CH, "alice"), UiSnapshot::idle());

        running(&mut manager, "ui", &["alice"]);
        tick(&mut manager);

        let snapshot = manager.ui_state(CH, "alice");
        assert!(snapshot.has_card);
        assert_eq!(snapshot.status, SessionStatus::Running);
        assert_eq!(snapshot.drawn_numbers, vec![draw_order("ui")[0]]);
        assert!(!manager.ui_state(CH, "bob").has_card);
    }

    #[test]
    fn test_state_events_follow_changes() {
        let mut manager = manager();
        running(&mut manager, "events", &["alice"]);
        let out = tick(&mut manager);

        match events(&out).last() {
            Some(TombalaEvent::State { status, drawn_numbers, .. }) => {
                assert_eq!(*status, SessionStatus::Running);
                assert_eq!(drawn_numbers.len(), 1);
            }
            other => panic!("expected state event, got {other:?}"),
        }
    }

    #[test]
    fn test_transcript_export() {
        let mut manager = manager();
        running(&mut manager, "export", &["alice"]);
        tick(&mut manager);
        send(&mut manager, "op", true, "!tombala bitir");

        let transcript = manager.transcript(CH).unwrap();
        assert_eq!(transcript.seed, "export");
        assert_eq!(transcript.draws.len(), 1);
        assert!(crate::proof::verify_transcript(&transcript).valid);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = GameConfig::from_lookup(|key| match key {
            "TOMBALA_INTERVAL_MS" => Some("5000".into()),
            "TOMBALA_SINGLE_WINNER" => Some("false".into()),
            "TOMBALA_RESTRICT_DRAW" => Some("1".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.draw_interval, Duration::from_secs(5));
        assert!(!config.single_winner_per_stage);
        assert!(config.restrict_draw);
        assert!(!config.allow_running_reseed);

        assert_eq!(GameConfig::from_lookup(|_| None).unwrap(), GameConfig::default());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = GameConfig::from_lookup(|key| {
            (key == "TOMBALA_INTERVAL_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid { key: "TOMBALA_INTERVAL_MS", value: "soon".into() });

        assert!(GameConfig::from_lookup(|key| {
            (key == "TOMBALA_SINGLE_WINNER").then(|| "maybe".to_string())
        })
        .is_err());
        assert!(GameConfig::from_lookup(|key| {
            (key == "TOMBALA_INTERVAL_MS").then(|| "0".to_string())
        })
        .is_err());
    }
}
