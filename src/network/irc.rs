//! IRC Line Codec
//!
//! Just enough IRC for the bot: parse incoming lines, format outgoing ones,
//! and track who holds channel operator rights from NAMES and MODE traffic.

use std::collections::{BTreeMap, BTreeSet};

use crate::network::session::{lookup_number, split_list, ConfigError};

// =============================================================================
// MESSAGES
// =============================================================================

/// One parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Source, without the leading `:`.
    pub prefix: Option<String>,
    /// Command or three-digit numeric.
    pub command: String,
    /// Parameters; a trailing parameter keeps its spaces.
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a line. IRCv3 tags are skipped. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r)?;
        }
        rest = rest.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, remainder) = stripped.split_once(' ')?;
                rest = remainder.trim_start();
                Some(prefix.to_owned())
            }
            None => None,
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split_whitespace();
        let command = words.next()?.to_ascii_uppercase();

        let mut params: Vec<String> = words.map(str::to_owned).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_owned());
        }

        Some(Self { prefix, command, params })
    }

    /// Nick part of the prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split(['!', '@']).next().unwrap_or(prefix))
    }

    /// Parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Whether `target` names a channel.
pub fn is_channel(target: &str) -> bool {
    target.starts_with(['#', '&'])
}

/// `PRIVMSG` line; line breaks in `text` are flattened.
pub fn privmsg(target: &str, text: &str) -> String {
    let text = text.replace(['\r', '\n'], " ");
    format!("PRIVMSG {target} :{text}")
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Connection settings for the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub password: Option<String>,
    /// Channels to join and serve.
    pub channels: Vec<String>,
    /// Nicks treated as operators everywhere.
    pub admins: Vec<String>,
}

impl IrcConfig {
    /// Load from environment variables.
    ///
    /// `IRC_HOST` is required. `IRC_PORT`, `IRC_NICK`, `IRC_USERNAME`,
    /// `IRC_REALNAME`, `IRC_PASS`, `IRC_CHANNELS` and `TOMBALA_ADMINS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("IRC_HOST")
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::Missing("IRC_HOST"))?;
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let channels = split_list(&text("IRC_CHANNELS", "#test,#test1"));
        if channels.is_empty() {
            return Err(ConfigError::Invalid {
                key: "IRC_CHANNELS",
                value: lookup("IRC_CHANNELS").unwrap_or_default(),
            });
        }

        Ok(Self {
            host,
            port: lookup_number(&lookup, "IRC_PORT", 6667)?,
            nick: text("IRC_NICK", "TombalaBot"),
            username: text("IRC_USERNAME", "tombala"),
            realname: text("IRC_REALNAME", "Tombala Authority Bot"),
            password: lookup("IRC_PASS").filter(|p| !p.is_empty()),
            channels,
            admins: split_list(&lookup("TOMBALA_ADMINS").unwrap_or_default()),
        })
    }

    /// Lines that register the connection.
    pub fn registration_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(password) = &self.password {
            lines.push(format!("PASS {password}"));
        }
        lines.push(format!("NICK {}", self.nick));
        lines.push(format!("USER {} 0 * :{}", self.username, self.realname));
        lines
    }
}

// =============================================================================
// OPERATOR TRACKING
// =============================================================================

/// Every membership prefix a NAMES entry may carry.
const MEMBER_PREFIXES: [char; 5] = ['~', '&', '@', '%', '+'];

/// Channel modes mapping to operator rights.
const OPERATOR_MODES: [char; 3] = ['q', 'a', 'o'];

/// Answers "is this nick a channel operator" from observed traffic.
#[derive(Debug, Clone, Default)]
pub struct OperatorTracker {
    /// channel -> nick -> operator modes held. Keys lowercase.
    channels: BTreeMap<String, BTreeMap<String, BTreeSet<char>>>,
    admins: BTreeSet<String>,
}

impl OperatorTracker {
    /// Tracker where `admins` are operators in every channel.
    pub fn new(admins: &[String]) -> Self {
        Self {
            channels: BTreeMap::new(),
            admins: admins.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    /// Whether `nick` may run restricted commands in `channel`.
    pub fn is_operator(&self, channel: &str, nick: &str) -> bool {
        let nick = nick.to_lowercase();
        self.admins.contains(&nick)
            || self
                .channels
                .get(&channel.to_lowercase())
                .and_then(|members| members.get(&nick))
                .is_some_and(|modes| !modes.is_empty())
    }

    /// Apply a NAMES reply entry list such as `@alice +bob ~carol`.
    pub fn on_names(&mut self, channel: &str, names: &str) {
        let members = self.channels.entry(channel.to_lowercase()).or_default();
        for entry in names.split_whitespace() {
            let nick = entry.trim_start_matches(MEMBER_PREFIXES);
            if nick.is_empty() {
                continue;
            }
            let prefixes = &entry[..entry.len() - nick.len()];
            let modes: BTreeSet<char> = prefixes.chars().filter_map(prefix_mode).collect();
            members.insert(nick.to_lowercase(), modes);
        }
    }

    /// Apply a channel MODE change such as `+o-v alice bob`.
    pub fn on_mode(&mut self, channel: &str, modes: &str, args: &[String]) {
        let members = self.channels.entry(channel.to_lowercase()).or_default();
        let mut args = args.iter();
        let mut adding = true;

        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                // Modes that always take a parameter.
                'q' | 'a' | 'o' | 'h' | 'v' | 'b' | 'e' | 'I' | 'k' => {
                    let Some(target) = args.next() else { break };
                    if OPERATOR_MODES.contains(&mode) {
                        let held = members.entry(target.to_lowercase()).or_default();
                        if adding {
                            held.insert(mode);
                        } else {
                            held.remove(&mode);
                        }
                    }
                }
                'l' if adding => {
                    args.next();
                }
                _ => {}
            }
        }
    }

    /// Someone joined.
    pub fn on_join(&mut self, channel: &str, nick: &str) {
        self.channels
            .entry(channel.to_lowercase())
            .or_default()
            .insert(nick.to_lowercase(), BTreeSet::new());
    }

    /// Someone left one channel.
    pub fn on_part(&mut self, channel: &str, nick: &str) {
        if let Some(members) = self.channels.get_mut(&channel.to_lowercase()) {
            members.remove(&nick.to_lowercase());
        }
    }

    /// Someone left the network.
    pub fn on_quit(&mut self, nick: &str) {
        let nick = nick.to_lowercase();
        for members in self.channels.values_mut() {
            members.remove(&nick);
        }
    }

    /// Someone changed nick.
    pub fn on_nick(&mut self, old: &str, new: &str) {
        let (old, new) = (old.to_lowercase(), new.to_lowercase());
        for members in self.channels.values_mut() {
            if let Some(modes) = members.remove(&old) {
                members.insert(new.clone(), modes);
            }
        }
    }

    /// We left a channel; forget its members.
    pub fn forget_channel(&mut self, channel: &str) {
        self.channels.remove(&channel.to_lowercase());
    }
}

/// Operator mode behind a membership prefix.
fn prefix_mode(prefix: char) -> Option<char> {
    match prefix {
        '~' => Some('q'),
        '&' => Some('a'),
        '@' => Some('o'),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg = IrcMessage::parse(":alice!a@host PRIVMSG #test :!tombala katil now\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(msg.nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#test", "!tombala katil now"]);
    }

    #[test]
    fn test_parse_without_prefix() {
        let msg = IrcMessage::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("irc.example.net"));
    }

    #[test]
    fn test_parse_tags_and_numerics() {
        let msg = IrcMessage::parse("@time=2024-01-01T00:00:00Z :irc.net 353 bot = #test :@alice +bob").unwrap();
        assert_eq!(msg.command, "353");
        assert_eq!(msg.params, vec!["bot", "=", "#test", "@alice +bob"]);
        assert_eq!(msg.nick(), Some("irc.net"));
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(IrcMessage::parse(""), None);
        assert_eq!(IrcMessage::parse("\r\n"), None);
    }

    #[test]
    fn test_privmsg_flattens_newlines() {
        assert_eq!(privmsg("#test", "a\nb"), "PRIVMSG #test :a b");
        assert!(is_channel("#test"));
        assert!(!is_channel("alice"));
    }

    #[test]
    fn test_config_defaults() {
        let config = IrcConfig::from_lookup(|key| (key == "IRC_HOST").then(|| "irc.example.net".into())).unwrap();
        assert_eq!(config.port, 6667);
        assert_eq!(config.nick, "TombalaBot");
        assert_eq!(config.channels, vec!["#test", "#test1"]);
        assert!(config.admins.is_empty());
        assert_eq!(
            config.registration_lines(),
            vec!["NICK TombalaBot", "USER tombala 0 * :Tombala Authority Bot"]
        );
    }

    #[test]
    fn test_config_overrides() {
        let config = IrcConfig::from_lookup(|key| match key {
            "IRC_HOST" => Some("irc.example.net".into()),
            "IRC_PORT" => Some("6697".into()),
            "IRC_PASS" => Some("secret".into()),
            "IRC_CHANNELS" => Some(" #a , ,#b ".into()),
            "TOMBALA_ADMINS" => Some("Root,ops".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.port, 6697);
        assert_eq!(config.channels, vec!["#a", "#b"]);
        assert_eq!(config.admins, vec!["Root", "ops"]);
        assert_eq!(config.registration_lines()[0], "PASS secret");
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(IrcConfig::from_lookup(|_| None), Err(ConfigError::Missing("IRC_HOST")));

        let bad_port = IrcConfig::from_lookup(|key| match key {
            "IRC_HOST" => Some("h".into()),
            "IRC_PORT" => Some("99999".into()),
            _ => None,
        });
        assert!(matches!(bad_port, Err(ConfigError::Invalid { key: "IRC_PORT", .. })));
    }

    #[test]
    fn test_names_prefixes() {
        let mut ops = OperatorTracker::default();
        ops.on_names("#test", "@alice +bob ~carol &dave %erin @+frank");

        assert!(ops.is_operator("#test", "alice"));
        assert!(!ops.is_operator("#test", "bob"));
        assert!(ops.is_operator("#test", "carol"));
        assert!(ops.is_operator("#TEST", "Dave"));
        assert!(!ops.is_operator("#test", "erin"));
        assert!(ops.is_operator("#test", "frank"));
        assert!(!ops.is_operator("#other", "alice"));
    }

    #[test]
    fn test_mode_changes() {
        let mut ops = OperatorTracker::default();
        ops.on_names("#test", "alice bob");

        let args: Vec<String> = vec!["alice".into(), "*!*@spam".into(), "bob".into()];
        ops.on_mode("#test", "+ob-v", &args[..2]);
        assert!(ops.is_operator("#test", "alice"));

        ops.on_mode("#test", "+l-o+v", &["10".into(), "alice".into(), "bob".into()]);
        assert!(!ops.is_operator("#test", "alice"));
        assert!(!ops.is_operator("#test", "bob"));

        ops.on_mode("#test", "+q", &args[2..]);
        assert!(ops.is_operator("#test", "bob"));
    }

    #[test]
    fn test_membership_changes() {
        let mut ops = OperatorTracker::default();
        ops.on_names("#test", "@alice @bob");
        ops.on_names("#other", "@alice");

        ops.on_nick("alice", "alicia");
        assert!(!ops.is_operator("#test", "alice"));
        assert!(ops.is_operator("#test", "alicia"));
        assert!(ops.is_operator("#other", "alicia"));

        ops.on_part("#test", "alicia");
        assert!(!ops.is_operator("#test", "alicia"));
        assert!(ops.is_operator("#other", "alicia"));

        ops.on_quit("alicia");
        assert!(!ops.is_operator("#other", "alicia"));

        ops.on_join("#test", "bob");
        assert!(!ops.is_operator("#test", "bob"));
    }

    #[test]
    fn test_admin_override() {
        let ops = OperatorTracker::new(&["Root".to_string()]);
        assert!(ops.is_operator("#anywhere", "root"));
        assert!(!ops.is_operator("#anywhere", "alice"));
    }
}
