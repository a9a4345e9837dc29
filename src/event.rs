//! Semantic events emitted by the engine.
//!
//! These are the supported surface for host applications; raw verb and
//! numeric routing (see [`crate::dispatch`]) exists for protocol
//! extensions, but everything a well-behaved client needs is here.

use crate::hostmask::Identity;
use crate::message::Message;
use crate::whois::WhoisRecord;

/// One semantic event derived from the protocol stream.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// The transport connected; registration is being sent.
    Connected,
    /// The transport closed, with the error text when it was not clean.
    Disconnected {
        error: Option<String>,
    },
    /// A transport-level or server-reported error. Not itself a teardown;
    /// a `Disconnected` follows if the connection is lost.
    Error {
        message: String,
    },
    /// Registration completed (first welcome/end-of-MOTD numeric).
    Registered,
    /// Every decoded line, before any interpretation.
    Raw(Message),
    /// A message to a channel.
    Message {
        sender: Identity,
        channel: String,
        text: String,
    },
    /// A private message to us.
    Pm {
        sender: Identity,
        text: String,
    },
    /// A notice addressed to us.
    Notice {
        sender: Identity,
        text: String,
    },
    /// A `/me` action, in a channel or in private.
    Action {
        sender: Identity,
        target: String,
        text: String,
    },
    /// A CTCP query addressed to us (other than ACTION).
    Ctcp {
        sender: Identity,
        verb: String,
        body: Option<String>,
    },
    /// An invitation to a channel.
    Invite {
        sender: Identity,
        channel: String,
    },
    /// Someone (possibly us) joined a channel.
    Join {
        user: Identity,
        channel: String,
    },
    /// Someone (possibly us) left a channel.
    Part {
        user: Identity,
        channel: String,
        message: Option<String>,
    },
    /// Someone was kicked from a channel.
    Kick {
        kicker: Identity,
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    /// Someone quit the network; `channels` lists the tracked channels
    /// they were removed from.
    Quit {
        user: Identity,
        message: Option<String>,
        channels: Vec<String>,
    },
    /// A channel MODE change, as received.
    Mode {
        changer: Option<Identity>,
        channel: String,
        modes: String,
        args: Vec<String>,
    },
    /// A privilege mode actually changed for one channel member.
    Access {
        changer: Option<Identity>,
        channel: String,
        nick: String,
        granted: bool,
        mode: char,
    },
    /// The channel topic was changed (`None` means cleared).
    Topic {
        changer: Option<Identity>,
        channel: String,
        topic: Option<String>,
    },
    /// A NAMES burst finished; the roster is authoritative.
    Names {
        channel: String,
    },
    /// A freshly joined channel finished bootstrapping (`data_loaded`).
    Channel {
        channel: String,
    },
    /// A WHOIS request completed.
    Whois(Box<WhoisRecord>),
    /// The server rejected our nick during registration; recovery is
    /// automatic unless the auto-renick reaction is disabled.
    BadNick {
        code: u16,
    },
}
