//! Per-channel membership and attribute state.
//!
//! A [`Channel`] is created when the local user joins and is enriched by
//! the bootstrap replies that follow (MODE and creation-time numerics,
//! the topic reply or its "no topic" counterpart, and one or more NAMES
//! lines). `data_loaded` flips exactly once, when every bootstrap fact
//! has arrived; until then the roster and attributes are best-effort.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::casemap::irc_to_lower;
use crate::isupport::CapabilityTable;

/// Channel topic knowledge.
///
/// `Unset` is an observed fact (the server said there is no topic) and is
/// distinct from `Unknown`, where no topic reply has arrived yet.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Topic {
    /// No topic reply observed yet.
    #[default]
    Unknown,
    /// The server reported that no topic is set.
    Unset,
    /// The current topic text.
    Set(String),
}

impl Topic {
    /// Whether a topic reply (either kind) has been observed.
    pub fn is_known(&self) -> bool {
        !matches!(self, Topic::Unknown)
    }

    /// The topic text, if one is set.
    pub fn text(&self) -> Option<&str> {
        match self {
            Topic::Set(text) => Some(text),
            _ => None,
        }
    }
}

/// One member of a channel roster.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ChannelUser {
    /// Displayed prefix symbol (e.g. `@`), or `None` for no privileges.
    pub prefix: Option<char>,
    /// Privilege mode letters currently granted, in arrival order.
    pub access: Vec<char>,
}

/// One joined (or observed) channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Channel name as received from the server.
    pub name: String,
    /// Current topic knowledge.
    pub topic: Topic,
    /// Channel creation time, once RPL_CREATIONTIME has arrived.
    pub created_at: Option<DateTime<Utc>>,
    nicks: Vec<String>,
    users: HashMap<String, ChannelUser>,
    modes: BTreeMap<char, Option<String>>,
    updating_names: bool,
    names_complete: bool,
    modes_known: bool,
    data_loaded: bool,
}

impl Channel {
    /// Create the entry for a freshly joined channel, with the local user
    /// as the only roster member.
    pub fn new(name: &str, self_nick: &str) -> Channel {
        let mut channel = Channel {
            name: name.to_string(),
            topic: Topic::Unknown,
            created_at: None,
            nicks: Vec::new(),
            users: HashMap::new(),
            modes: BTreeMap::new(),
            updating_names: false,
            names_complete: false,
            modes_known: false,
            data_loaded: false,
        };
        channel.add_nick(self_nick);
        channel
    }

    /// The roster, in NAMES-list order. Order carries no meaning beyond
    /// display.
    pub fn nicks(&self) -> &[String] {
        &self.nicks
    }

    /// Per-member state lookup, case-insensitively.
    pub fn user(&self, nick: &str) -> Option<&ChannelUser> {
        self.users.get(&irc_to_lower(nick))
    }

    /// Whether a nick is currently in the roster.
    pub fn contains(&self, nick: &str) -> bool {
        self.users.contains_key(&irc_to_lower(nick))
    }

    /// The set non-prefix channel modes, with values for the classes
    /// that carry one.
    pub fn modes(&self) -> &BTreeMap<char, Option<String>> {
        &self.modes
    }

    /// Whether a channel mode letter is currently set.
    pub fn has_mode(&self, letter: char) -> bool {
        self.modes.contains_key(&letter)
    }

    /// Whether all bootstrap facts have arrived.
    pub fn data_loaded(&self) -> bool {
        self.data_loaded
    }

    /// Whether a NAMES burst is in progress (roster not authoritative).
    pub fn updating_names(&self) -> bool {
        self.updating_names
    }

    pub(crate) fn add_nick(&mut self, nick: &str) {
        let key = irc_to_lower(nick);
        if self.users.contains_key(&key) {
            return;
        }
        self.nicks.push(nick.to_string());
        self.users.insert(key, ChannelUser::default());
    }

    pub(crate) fn remove_nick(&mut self, nick: &str) -> bool {
        let key = irc_to_lower(nick);
        if self.users.remove(&key).is_none() {
            return false;
        }
        self.nicks.retain(|n| irc_to_lower(n) != key);
        true
    }

    pub(crate) fn rename_nick(&mut self, old: &str, new: &str) {
        let old_key = irc_to_lower(old);
        let Some(user) = self.users.remove(&old_key) else {
            return;
        };
        self.users.insert(irc_to_lower(new), user);
        for nick in &mut self.nicks {
            if irc_to_lower(nick) == old_key {
                *nick = new.to_string();
            }
        }
    }

    pub(crate) fn set_mode(&mut self, letter: char, value: Option<String>) {
        self.modes.insert(letter, value);
    }

    pub(crate) fn unset_mode(&mut self, letter: char) {
        self.modes.remove(&letter);
    }

    pub(crate) fn mark_modes_known(&mut self) {
        self.modes_known = true;
    }

    /// Grant or revoke a privilege mode on a member. Returns true only
    /// when the member's access set actually changed; the displayed
    /// prefix is recomputed from the capability table's order on change.
    pub(crate) fn set_access(
        &mut self,
        nick: &str,
        mode: char,
        granted: bool,
        caps: &CapabilityTable,
    ) -> bool {
        let Some(user) = self.users.get_mut(&irc_to_lower(nick)) else {
            return false;
        };

        let changed = if granted {
            if user.access.contains(&mode) {
                false
            } else {
                user.access.push(mode);
                true
            }
        } else {
            let before = user.access.len();
            user.access.retain(|&m| m != mode);
            user.access.len() != before
        };

        if changed {
            user.prefix = caps.highest_prefix(&user.access);
        }
        changed
    }

    /// Begin a NAMES burst: the roster is rebuilt from scratch and is not
    /// authoritative until [`Channel::end_names`].
    pub(crate) fn begin_names(&mut self) {
        self.nicks.clear();
        self.users.clear();
        self.updating_names = true;
    }

    /// Add one NAMES-list entry, stripping any leading prefix symbols and
    /// converting them into privilege modes.
    pub(crate) fn add_names_entry(&mut self, token: &str, caps: &CapabilityTable) {
        let mut modes = Vec::new();
        let mut rest = token;
        while let Some(c) = rest.chars().next() {
            match caps.mode_for_symbol(c) {
                Some(mode) => {
                    modes.push(mode);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        if rest.is_empty() {
            return;
        }

        let key = irc_to_lower(rest);
        if !self.users.contains_key(&key) {
            self.nicks.push(rest.to_string());
        }
        let prefix = caps.highest_prefix(&modes);
        self.users.insert(
            key,
            ChannelUser {
                prefix,
                access: modes,
            },
        );
    }

    /// Finish a NAMES burst; the roster is authoritative again.
    pub(crate) fn end_names(&mut self) {
        self.updating_names = false;
        self.names_complete = true;
    }

    /// Check the bootstrap facts; flips `data_loaded` and returns true
    /// exactly once, when the last fact arrives.
    pub(crate) fn try_complete(&mut self, self_nick: &str) -> bool {
        if self.data_loaded {
            return false;
        }
        if self.names_complete
            && self.contains(self_nick)
            && self.modes_known
            && self.topic.is_known()
            && self.created_at.is_some()
        {
            self.data_loaded = true;
            return true;
        }
        false
    }
}
