//! Owned IRC message type and wire serialization.

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::hostmask::Identity;

use super::parse::split_line;

/// One decoded IRC protocol line.
///
/// The command is stored exactly as received; comparisons should use
/// [`Message::command_is`] or [`Message::numeric`], and serialization
/// uppercases it. The trailing segment is kept apart from the middle
/// arguments so that an empty trailing (`... :`) stays distinguishable
/// from an absent one.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Raw sender string, without the leading `:`.
    pub prefix: Option<String>,
    /// Command verb or 3-digit numeric code, as received.
    pub command: String,
    /// Middle arguments, excluding the trailing segment.
    pub args: Vec<String>,
    /// Trailing free-text segment, without the leading `:`.
    pub tail: Option<String>,
}

impl Message {
    /// Build a message from parts.
    pub fn new(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        tail: Option<impl Into<String>>,
    ) -> Message {
        Message {
            prefix: None,
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            tail: tail.map(Into::into),
        }
    }

    /// Decode a raw protocol line.
    ///
    /// Decoding is lenient: malformed input degrades to a best-effort
    /// message (possibly with an empty command) rather than failing,
    /// since one garbled line must never tear down a session. Runs of
    /// spaces between arguments act as a single separator and empty
    /// argument tokens are never produced.
    pub fn parse(raw: &str) -> Message {
        let line = split_line(raw);
        Message {
            prefix: line.prefix.map(str::to_string),
            command: line.command.to_string(),
            args: line.args.into_iter().map(str::to_string).collect(),
            tail: line.tail.map(str::to_string),
        }
    }

    /// Case-insensitive command comparison.
    pub fn command_is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric reply code, if the command is exactly three ASCII digits.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Positional argument accessor.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The sender identity parsed from the prefix, if a prefix is present.
    pub fn sender(&self) -> Option<Identity> {
        self.prefix.as_deref().map(Identity::parse)
    }

    // ---- constructors for the commands the engine sends ----

    /// `PASS <password>`
    pub fn pass(password: &str) -> Message {
        Message::new("PASS", [password], None::<&str>)
    }

    /// `NICK <nickname>`
    pub fn nick(nickname: &str) -> Message {
        Message::new("NICK", [nickname], None::<&str>)
    }

    /// `USER <username> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Message {
        Message::new("USER", [username, "0", "*"], Some(realname))
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Message {
        Message::new("PRIVMSG", [target], Some(text))
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: &str, text: &str) -> Message {
        Message::new("NOTICE", [target], Some(text))
    }

    /// `JOIN <channel> [key]`
    pub fn join(channel: &str, key: Option<&str>) -> Message {
        let mut args = vec![channel];
        if let Some(key) = key {
            args.push(key);
        }
        Message::new("JOIN", args, None::<&str>)
    }

    /// `PART <channel> [:message]`
    pub fn part(channel: &str, message: Option<&str>) -> Message {
        Message::new("PART", [channel], message)
    }

    /// `KICK <channel> <nick> [:reason]`
    pub fn kick(channel: &str, nick: &str, reason: Option<&str>) -> Message {
        Message::new("KICK", [channel, nick], reason)
    }

    /// `MODE <target> [modestring args...]`
    pub fn mode(target: &str, modes: &str, args: &[&str]) -> Message {
        let mut all = vec![target];
        if !modes.is_empty() {
            all.push(modes);
        }
        all.extend_from_slice(args);
        Message::new("MODE", all, None::<&str>)
    }

    /// `TOPIC <channel>` (query) or `TOPIC <channel> :<topic>` (set).
    pub fn topic(channel: &str, topic: Option<&str>) -> Message {
        Message::new("TOPIC", [channel], topic)
    }

    /// `NAMES <channel>`
    pub fn names(channel: &str) -> Message {
        Message::new("NAMES", [channel], None::<&str>)
    }

    /// `WHOIS <nick>`
    pub fn whois(nick: &str) -> Message {
        Message::new("WHOIS", [nick], None::<&str>)
    }

    /// `QUIT [:message]`
    pub fn quit(message: Option<&str>) -> Message {
        Message::new("QUIT", Vec::<&str>::new(), message)
    }

    /// A `PONG` echoing the arguments of the given `PING`.
    pub fn pong_for(ping: &Message) -> Message {
        Message {
            prefix: None,
            command: "PONG".to_string(),
            args: ping.args.clone(),
            tail: ping.tail.clone(),
        }
    }
}

impl fmt::Display for Message {
    /// Serialize to wire form, without any line terminator.
    ///
    /// The command is uppercased, arguments are joined by single spaces,
    /// and the trailing segment is appended as `" :"` plus the text,
    /// whether or not the text is empty or contains colons.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command.to_ascii_uppercase())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(tail) = &self.tail {
            write!(f, " :{}", tail)?;
        }
        Ok(())
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Message, MessageParseError> {
        if s.trim_end_matches(['\r', '\n']).is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }
        Ok(Message::parse(s))
    }
}
