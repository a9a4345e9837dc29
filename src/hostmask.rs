//! Hostmask parsing.
//!
//! Message prefixes carry the sender as either a `nick!user@host` hostmask
//! or a bare server name. [`Identity`] splits the former into its triple;
//! anything that does not match the shape degenerates to the full string
//! in all three positions, so server-sourced lines still produce a usable
//! sender value.

use std::fmt;

/// The parsed identity behind a message prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// Nickname portion, or the whole hostmask for degenerate input.
    pub nick: String,
    /// Username (ident) portion, or the whole hostmask for degenerate input.
    pub username: String,
    /// Hostname portion, or the whole hostmask for degenerate input.
    pub hostname: String,
    /// The original hostmask string, as received.
    pub hostmask: String,
}

impl Identity {
    /// Parse a `nick!user@host` hostmask.
    ///
    /// If the input does not contain both `!` and `@` in that order, the
    /// identity is degenerate: `nick`, `username` and `hostname` all hold
    /// the full input.
    pub fn parse(hostmask: &str) -> Identity {
        if let Some((nick, rest)) = hostmask.split_once('!') {
            if let Some((username, hostname)) = rest.split_once('@') {
                return Identity {
                    nick: nick.to_string(),
                    username: username.to_string(),
                    hostname: hostname.to_string(),
                    hostmask: hostmask.to_string(),
                };
            }
        }

        Identity {
            nick: hostmask.to_string(),
            username: hostmask.to_string(),
            hostname: hostmask.to_string(),
            hostmask: hostmask.to_string(),
        }
    }

    /// Whether this identity came from input that matched `nick!user@host`.
    pub fn is_user(&self) -> bool {
        self.nick != self.hostmask
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostmask)
    }
}
