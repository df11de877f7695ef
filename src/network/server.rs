//! IRC Bot
//!
//! Connects to one IRC server, keeps operator state up to date and feeds
//! channel commands and draw ticks into the [`SessionManager`].
//!
//! Line handling is synchronous ([`TombalaBot::handle_line`],
//! [`TombalaBot::on_tick`]) and returns the lines to send, so the whole bot
//! can be driven in tests without a socket. [`TombalaBot::run`] wraps it in
//! the async connection loop.

use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::network::irc::{is_channel, privmsg, IrcConfig, IrcMessage, OperatorTracker};
use crate::network::protocol::Inbound;
use crate::network::scheduler::{DrawScheduler, TimerKey, TokioScheduler};
use crate::network::session::{Outgoing, SessionManager};

/// Sent with QUIT on shutdown.
const QUIT_MESSAGE: &str = "Tombala bitti, görüşmek üzere.";

/// Bot errors.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Socket failure.
    #[error("IRC connection error: {0}")]
    Io(#[from] io::Error),

    /// Server closed the connection.
    #[error("IRC server closed the connection")]
    Disconnected,
}

/// Tombala authority bot.
pub struct TombalaBot<S: DrawScheduler> {
    config: IrcConfig,
    manager: SessionManager<S>,
    operators: OperatorTracker,
    /// Our current nick; the server may change it.
    nick: String,
}

impl<S: DrawScheduler> TombalaBot<S> {
    /// Create a bot.
    pub fn new(config: IrcConfig, manager: SessionManager<S>) -> Self {
        let operators = OperatorTracker::new(&config.admins);
        let nick = config.nick.clone();
        Self { config, manager, operators, nick }
    }

    /// Current nick.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// The session manager.
    pub fn manager(&self) -> &SessionManager<S> {
        &self.manager
    }

    /// Operator state seen so far.
    pub fn operators(&self) -> &OperatorTracker {
        &self.operators
    }

    /// Process one line from the server and return the lines to send back.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        let Some(msg) = IrcMessage::parse(line) else {
            return Vec::new();
        };

        match msg.command.as_str() {
            "PING" => vec![format!("PONG :{}", msg.param(0).unwrap_or_default())],
            // RPL_WELCOME
            "001" => {
                if let Some(nick) = msg.param(0) {
                    self.nick = nick.to_owned();
                }
                info!(nick = %self.nick, "Registered with server");
                self.config.channels.iter().map(|c| format!("JOIN {c}")).collect()
            }
            // ERR_NICKNAMEINUSE
            "433" => {
                self.nick.push('_');
                warn!(nick = %self.nick, "Nick in use, retrying");
                vec![format!("NICK {}", self.nick)]
            }
            // RPL_NAMREPLY
            "353" => {
                if let (Some(channel), Some(names)) = (msg.param(2), msg.param(3)) {
                    self.operators.on_names(channel, names);
                }
                Vec::new()
            }
            "MODE" => {
                if let (Some(channel), Some(modes)) = (msg.param(0), msg.param(1)) {
                    if is_channel(channel) {
                        self.operators.on_mode(channel, modes, &msg.params[2..]);
                    }
                }
                Vec::new()
            }
            "JOIN" => {
                if let (Some(nick), Some(channel)) = (msg.nick(), msg.param(0)) {
                    if self.is_me(nick) {
                        info!(channel, "Joined channel");
                        self.operators.forget_channel(channel);
                    } else {
                        self.operators.on_join(channel, nick);
                    }
                }
                Vec::new()
            }
            "PART" => {
                if let (Some(nick), Some(channel)) = (msg.nick(), msg.param(0)) {
                    self.left(channel, nick);
                }
                Vec::new()
            }
            "KICK" => {
                if let (Some(channel), Some(target)) = (msg.param(0), msg.param(1)) {
                    self.left(channel, target);
                }
                Vec::new()
            }
            "QUIT" => {
                if let Some(nick) = msg.nick() {
                    self.operators.on_quit(nick);
                }
                Vec::new()
            }
            "NICK" => {
                if let (Some(old), Some(new)) = (msg.nick(), msg.param(0)) {
                    if self.is_me(old) {
                        self.nick = new.to_owned();
                    }
                    self.operators.on_nick(old, new);
                }
                Vec::new()
            }
            "PRIVMSG" => self.on_privmsg(&msg),
            "ERROR" => {
                error!(reason = msg.param(0).unwrap_or_default(), "Server error");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Process an auto-draw tick.
    pub fn on_tick(&mut self, key: &TimerKey) -> Vec<String> {
        let mut out = Vec::new();
        self.manager.on_tick(key, &mut out);
        outgoing_lines(out)
    }

    fn on_privmsg(&mut self, msg: &IrcMessage) -> Vec<String> {
        let (Some(nick), Some(target), Some(text)) = (msg.nick(), msg.param(0), msg.param(1)) else {
            return Vec::new();
        };
        if !is_channel(target) || self.is_me(nick) {
            return Vec::new();
        }

        let is_operator = self.operators.is_operator(target, nick);
        let Some(inbound) = Inbound::parse(target, nick, is_operator, text) else {
            return Vec::new();
        };

        debug!(channel = target, nick, command = inbound.command.keyword(), "Command received");
        let mut out = Vec::new();
        self.manager.handle(&inbound, &mut out);
        outgoing_lines(out)
    }

    fn left(&mut self, channel: &str, nick: &str) {
        if self.is_me(nick) {
            info!(channel, "Left channel");
            self.operators.forget_channel(channel);
        } else {
            self.operators.on_part(channel, nick);
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nick)
    }
}

impl TombalaBot<TokioScheduler> {
    /// Connect and serve until Ctrl-C or disconnect.
    ///
    /// `ticks` is the receiver returned by [`TokioScheduler::new`] for the
    /// scheduler inside this bot's manager.
    pub async fn run(mut self, mut ticks: mpsc::UnboundedReceiver<TimerKey>) -> Result<(), BotError> {
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        info!(host = %self.config.host, port = self.config.port, "Connected");

        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        send_lines(&mut writer, &self.config.registration_lines()).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        warn!("Server closed the connection");
                        return Err(BotError::Disconnected);
                    };
                    let replies = self.handle_line(&line);
                    send_lines(&mut writer, &replies).await?;
                }
                Some(key) = ticks.recv() => {
                    let replies = self.on_tick(&key);
                    send_lines(&mut writer, &replies).await?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    send_lines(&mut writer, &[format!("QUIT :{QUIT_MESSAGE}")]).await?;
                    return Ok(());
                }
            }
        }
    }
}

/// Render manager output as IRC lines.
fn outgoing_lines(out: Vec<Outgoing>) -> Vec<String> {
    out.into_iter()
        .filter_map(|message| match message {
            Outgoing::Reply { channel, text } => Some(privmsg(&channel, &text)),
            Outgoing::Draw { channel, number } => {
                Some(privmsg(&channel, &format!("Çekilen sayı: {number}")))
            }
            Outgoing::Event { channel, event } => match event.to_line() {
                Ok(line) => Some(privmsg(&channel, &line)),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Failed to encode event");
                    None
                }
            },
        })
        .collect()
}

async fn send_lines<W: AsyncWrite + Unpin>(writer: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        debug!(line = %line, "Sending");
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
    }
    writer.flush().await
}

// =============================================================================
// TESTS
// =============================================================================
