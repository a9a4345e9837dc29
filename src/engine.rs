//! Sans-IO session engine.
//!
//! The engine consumes decoded protocol lines and produces actions:
//! messages to send (flood-scheduled or immediate) and semantic events.
//! It performs no I/O itself, which keeps every piece of session state —
//! registration, the capability table, channel membership, WHOIS
//! aggregation — testable without a socket. The tokio session driver in
//! [`crate::session`] is the only consumer that attaches it to a
//! transport.
//!
//! State mutation is not synchronized here; callers own serialization
//! (the driver shares the engine behind a mutex with the session handle).

use std::collections::HashMap;

use chrono::{Local, TimeZone, Utc};
use tracing::debug;

use crate::casemap::{irc_eq, irc_to_lower};
use crate::chan::ChannelExt;
use crate::channel::{Channel, Topic};
use crate::ctcp::{self, Ctcp};
use crate::dispatch::{BuiltinReactions, Dispatcher};
use crate::event::Event;
use crate::hostmask::Identity;
use crate::isupport::CapabilityTable;
use crate::message::Message;
use crate::mode::{parse_mode_delta, ModeChange};
use crate::response::Response;
use crate::whois::{WhoisRecord, WhoisTracker};

/// Actions produced by the engine.
///
/// The caller is responsible for executing these in order.
#[derive(Debug)]
pub enum EngineAction {
    /// Write this message through the flood-controlled sender.
    Send(Message),
    /// Write this message immediately, bypassing the flood schedule
    /// (registration handshake lines).
    SendNow(Message),
    /// Deliver this event to the host application.
    Emit(Event),
}

/// Identity configuration for registration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profile {
    /// Desired nickname. Spaces are stripped.
    pub nickname: String,
    /// Fallback nickname for an erroneous-nick rejection during
    /// registration. `None` falls back to appending `_`.
    pub alternate: Option<String>,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password, sent as PASS before NICK when present.
    pub password: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            nickname: "slirc".to_string(),
            alternate: None,
            username: "slirc".to_string(),
            realname: "slirc-client user".to_string(),
            password: None,
        }
    }
}

/// The per-session protocol state machine.
pub struct Engine {
    profile: Profile,
    /// Built-in reaction toggles; flip these to replace default behavior.
    pub reactions: BuiltinReactions,
    dispatcher: Dispatcher,
    caps: CapabilityTable,
    channels: HashMap<String, Channel>,
    whois: WhoisTracker,
    registered: bool,
    my_nick: String,
    prev_nick: String,
}

impl Engine {
    /// Create an engine for one session.
    pub fn new(mut profile: Profile) -> Engine {
        profile.nickname = profile.nickname.replace(' ', "");
        let my_nick = profile.nickname.clone();
        Engine {
            profile,
            reactions: BuiltinReactions::default(),
            dispatcher: Dispatcher::default(),
            caps: CapabilityTable::default(),
            channels: HashMap::new(),
            whois: WhoisTracker::default(),
            registered: false,
            my_nick: my_nick.clone(),
            prev_nick: my_nick,
        }
    }

    /// Our current nickname, as last confirmed or requested.
    pub fn my_nick(&self) -> &str {
        &self.my_nick
    }

    /// Whether registration has completed on the current connection.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// The server capability table (defaults until advertised).
    pub fn caps(&self) -> &CapabilityTable {
        &self.caps
    }

    /// Look up a tracked channel, case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&irc_to_lower(name))
    }

    /// Iterate over all tracked channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Cached WHOIS record lookup.
    pub fn whois_record(&self, nick: &str) -> Option<&WhoisRecord> {
        self.whois.get(nick)
    }

    /// The observer registry.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Record a locally initiated nick change, remembering the previous
    /// nick so a server rejection can revert it.
    pub fn note_nick(&mut self, nick: &str) {
        self.prev_nick = std::mem::replace(&mut self.my_nick, nick.to_string());
    }

    /// Mark a WHOIS request as in flight for a nick.
    pub fn begin_whois(&mut self, nick: &str) {
        self.whois.begin(nick);
    }

    /// The transport connected: emit the event and produce the
    /// registration handshake (PASS?, NICK, USER), which bypasses the
    /// flood schedule.
    pub fn on_connected(&mut self) -> Vec<EngineAction> {
        let mut out = Vec::new();
        self.emit(Event::Connected, &mut out);

        if let Some(password) = self.profile.password.clone() {
            out.push(EngineAction::SendNow(Message::pass(&password)));
        }
        let nick = self.profile.nickname.clone();
        self.note_nick(&nick);
        out.push(EngineAction::SendNow(Message::nick(&nick)));
        let (username, realname) = (self.profile.username.clone(), self.profile.realname.clone());
        out.push(EngineAction::SendNow(Message::user(&username, &realname)));
        out
    }

    /// The transport closed: reset connection-scoped state and emit the
    /// disconnect event. Channel state does not survive a disconnect.
    pub fn on_disconnected(&mut self, error: Option<String>) -> Vec<EngineAction> {
        self.registered = false;
        self.channels.clear();
        let mut out = Vec::new();
        self.emit(Event::Disconnected { error }, &mut out);
        out
    }

    /// Process one decoded line from the transport.
    pub fn feed_line(&mut self, raw: &str) -> Vec<EngineAction> {
        let msg = Message::parse(raw);
        if msg.command.is_empty() && msg.args.is_empty() && msg.tail.is_none() {
            return Vec::new();
        }

        let mut out = Vec::new();
        self.dispatcher.dispatch_raw(&msg);
        self.emit(Event::Raw(msg.clone()), &mut out);

        if let Some(code) = msg.numeric() {
            self.handle_numeric(code, &msg, &mut out);
            return out;
        }

        match msg.command.to_ascii_uppercase().as_str() {
            "PING" => {
                if self.reactions.auto_pong {
                    out.push(EngineAction::Send(Message::pong_for(&msg)));
                }
            }
            "NICK" => self.handle_nick(&msg),
            "JOIN" => self.handle_join(&msg, &mut out),
            "PART" => self.handle_part(&msg, &mut out),
            "KICK" => self.handle_kick(&msg, &mut out),
            "QUIT" => self.handle_quit(&msg, &mut out),
            "MODE" => self.handle_mode(&msg, &mut out),
            "TOPIC" => self.handle_topic(&msg, &mut out),
            "PRIVMSG" => self.handle_privmsg(&msg, &mut out),
            "NOTICE" => self.handle_notice(&msg, &mut out),
            "INVITE" => self.handle_invite(&msg, &mut out),
            "ERROR" => {
                let message = msg.tail.clone().unwrap_or_default();
                self.emit(Event::Error { message }, &mut out);
            }
            _ => {}
        }
        out
    }

    fn emit(&mut self, event: Event, out: &mut Vec<EngineAction>) {
        self.dispatcher.emit(&event);
        out.push(EngineAction::Emit(event));
    }

    fn handle_nick(&mut self, msg: &Message) {
        let Some(sender) = msg.sender() else { return };
        let Some(new_nick) = msg.arg(0).or(msg.tail.as_deref()) else {
            return;
        };
        let new_nick = new_nick.to_string();

        if irc_eq(&sender.nick, &self.my_nick) {
            self.prev_nick = std::mem::replace(&mut self.my_nick, new_nick.clone());
        }
        for channel in self.channels.values_mut() {
            channel.rename_nick(&sender.nick, &new_nick);
        }
    }

    fn handle_join(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(user) = msg.sender() else { return };
        let Some(channel) = msg.arg(0).or(msg.tail.as_deref()) else {
            return;
        };
        let channel = channel.to_string();
        let key = irc_to_lower(&channel);

        if irc_eq(&user.nick, &self.my_nick) {
            self.channels
                .insert(key, Channel::new(&channel, &self.my_nick));
            // Bootstrap queries; NAMES arrives with the join burst.
            out.push(EngineAction::Send(Message::mode(&channel, "", &[])));
            out.push(EngineAction::Send(Message::topic(&channel, None)));
        } else if let Some(chan) = self.channels.get_mut(&key) {
            chan.add_nick(&user.nick);
        } else {
            debug!(channel = %channel, "JOIN for untracked channel, skipping");
        }

        self.emit(Event::Join { user, channel }, out);
    }

    fn handle_part(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(user) = msg.sender() else { return };
        let (channel, message) = match msg.arg(0) {
            Some(channel) => (channel.to_string(), msg.tail.clone()),
            None => match msg.tail.clone() {
                Some(channel) => (channel, None),
                None => return,
            },
        };
        let key = irc_to_lower(&channel);

        if irc_eq(&user.nick, &self.my_nick) {
            self.channels.remove(&key);
        } else if let Some(chan) = self.channels.get_mut(&key) {
            chan.remove_nick(&user.nick);
        }

        self.emit(
            Event::Part {
                user,
                channel,
                message,
            },
            out,
        );
    }

    fn handle_kick(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(kicker) = msg.sender() else { return };
        let (Some(channel), Some(nick)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let (channel, nick) = (channel.to_string(), nick.to_string());
        let key = irc_to_lower(&channel);

        if irc_eq(&nick, &self.my_nick) {
            self.channels.remove(&key);
        } else if let Some(chan) = self.channels.get_mut(&key) {
            chan.remove_nick(&nick);
        }

        self.emit(
            Event::Kick {
                kicker,
                channel,
                nick,
                reason: msg.tail.clone(),
            },
            out,
        );
    }

    fn handle_quit(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(user) = msg.sender() else { return };
        let mut affected = Vec::new();
        for channel in self.channels.values_mut() {
            if channel.remove_nick(&user.nick) {
                affected.push(channel.name.clone());
            }
        }

        self.emit(
            Event::Quit {
                user,
                message: msg.tail.clone(),
                channels: affected,
            },
            out,
        );
    }

    fn handle_mode(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(target) = msg.arg(0) else { return };
        if !target.is_channel_name() {
            // User modes are not tracked.
            return;
        }
        let channel = target.to_string();
        let modes = msg.arg(1).unwrap_or("").to_string();
        let params: Vec<String> = msg.args.iter().skip(2).cloned().collect();
        let changer = msg.sender();

        self.apply_channel_modes(&channel, &modes, &params, changer.clone(), true, out);
        self.emit(
            Event::Mode {
                changer,
                channel,
                modes,
                args: params,
            },
            out,
        );
    }

    /// Apply a mode delta to a tracked channel. `announce` controls
    /// whether access changes produce events (the bootstrap MODE summary
    /// is applied silently).
    fn apply_channel_modes(
        &mut self,
        channel: &str,
        modes: &str,
        params: &[String],
        changer: Option<Identity>,
        announce: bool,
        out: &mut Vec<EngineAction>,
    ) {
        let key = irc_to_lower(channel);
        let Some(chan) = self.channels.get_mut(&key) else {
            debug!(channel = %channel, "MODE for untracked channel, skipping");
            return;
        };

        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let mut access_events = Vec::new();
        for change in parse_mode_delta(&self.caps, modes, &params) {
            match change {
                ModeChange::List { .. } => {}
                ModeChange::Channel { set, mode, value } => {
                    if set {
                        chan.set_mode(mode, value);
                    } else {
                        chan.unset_mode(mode);
                    }
                }
                ModeChange::Access { set, mode, nick } => {
                    if !chan.contains(&nick) {
                        debug!(channel = %channel, nick = %nick, "MODE for nick not in roster, skipping");
                        continue;
                    }
                    if chan.set_access(&nick, mode, set, &self.caps) && announce {
                        access_events.push(Event::Access {
                            changer: changer.clone(),
                            channel: chan.name.clone(),
                            nick,
                            granted: set,
                            mode,
                        });
                    }
                }
            }
        }
        for event in access_events {
            self.emit(event, out);
        }
    }

    fn handle_topic(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(channel) = msg.arg(0) else { return };
        let channel = channel.to_string();
        let changer = msg.sender();
        // An empty trailing clears the topic.
        let topic = msg.tail.clone().filter(|t| !t.is_empty());

        if let Some(chan) = self.channels.get_mut(&irc_to_lower(&channel)) {
            chan.topic = match &topic {
                Some(text) => Topic::Set(text.clone()),
                None => Topic::Unset,
            };
        } else {
            debug!(channel = %channel, "TOPIC for untracked channel, skipping");
        }

        self.emit(
            Event::Topic {
                changer,
                channel: channel.clone(),
                topic,
            },
            out,
        );
        self.refresh_bootstrap(&channel, out);
    }

    fn handle_privmsg(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(sender) = msg.sender() else { return };
        let Some(target) = msg.arg(0) else { return };
        let target = target.to_string();
        let text = msg.tail.clone().unwrap_or_default();
        let to_me = irc_eq(&target, &self.my_nick);

        if let Some(query) = Ctcp::parse(&text) {
            if query.is_action() {
                self.emit(
                    Event::Action {
                        sender,
                        target,
                        text: query.body.unwrap_or_default(),
                    },
                    out,
                );
            } else if to_me {
                self.emit(
                    Event::Ctcp {
                        sender: sender.clone(),
                        verb: query.verb.clone(),
                        body: query.body.clone(),
                    },
                    out,
                );
                self.auto_ctcp_reply(&sender, &query, out);
            }
            return;
        }

        if to_me {
            self.emit(Event::Pm { sender, text }, out);
        } else {
            self.emit(
                Event::Message {
                    sender,
                    channel: target,
                    text,
                },
                out,
            );
        }
    }

    fn auto_ctcp_reply(&mut self, sender: &Identity, query: &Ctcp, out: &mut Vec<EngineAction>) {
        let payload = if query.verb.eq_ignore_ascii_case("PING") && self.reactions.auto_ctcp_ping {
            match &query.body {
                Some(body) => format!("PING {body}"),
                None => "PING".to_string(),
            }
        } else if query.verb.eq_ignore_ascii_case("TIME") && self.reactions.auto_ctcp_time {
            format!("TIME {}", Local::now().to_rfc2822())
        } else {
            return;
        };
        out.push(EngineAction::Send(Message::notice(
            &sender.nick,
            &ctcp::wrap(&payload),
        )));
    }

    fn handle_notice(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(sender) = msg.sender() else { return };
        let Some(target) = msg.arg(0) else { return };
        if !irc_eq(target, &self.my_nick) {
            return;
        }
        let text = msg.tail.clone().unwrap_or_default();
        self.emit(Event::Notice { sender, text }, out);
    }

    fn handle_invite(&mut self, msg: &Message, out: &mut Vec<EngineAction>) {
        let Some(sender) = msg.sender() else { return };
        let Some(channel) = msg.tail.as_deref().or(msg.arg(1)) else {
            return;
        };
        let channel = channel.to_string();
        self.emit(Event::Invite { sender, channel }, out);
    }

    fn handle_numeric(&mut self, code: u16, msg: &Message, out: &mut Vec<EngineAction>) {
        use Response::*;

        let Some(response) = Response::from_code(code) else {
            return;
        };
        match response {
            RPL_WELCOME | RPL_MYINFO | RPL_ENDOFMOTD | ERR_NOMOTD => {
                if !self.registered {
                    self.registered = true;
                    if let Some(nick) = msg.arg(0).filter(|n| !n.is_empty() && *n != "*") {
                        self.my_nick = nick.to_string();
                    }
                    self.emit(Event::Registered, out);
                }
            }
            RPL_ISUPPORT => {
                self.caps
                    .apply_isupport(msg.args.iter().skip(1).map(String::as_str));
            }
            ERR_ERRONEUSNICKNAME | ERR_NICKNAMEINUSE => self.handle_bad_nick(code, out),
            RPL_AWAY | RPL_WHOISUSER | RPL_WHOISSERVER | RPL_WHOISOPERATOR | RPL_WHOISIDLE
            | RPL_WHOISCHANNELS | RPL_ENDOFWHOIS => {
                if let Some(record) = self.whois.apply(response, msg) {
                    self.emit(Event::Whois(Box::new(record)), out);
                }
            }
            RPL_CHANNELMODEIS => {
                // [me, channel, modestring, params...]
                let Some(channel) = msg.arg(1) else { return };
                let channel = channel.to_string();
                let modes = msg.arg(2).unwrap_or("").to_string();
                let params: Vec<String> = msg.args.iter().skip(3).cloned().collect();
                self.apply_channel_modes(&channel, &modes, &params, None, false, out);
                if let Some(chan) = self.channels.get_mut(&irc_to_lower(&channel)) {
                    chan.mark_modes_known();
                }
                self.refresh_bootstrap(&channel, out);
            }
            RPL_CREATIONTIME => {
                let (Some(channel), Some(stamp)) = (msg.arg(1), msg.arg(2)) else {
                    return;
                };
                let channel = channel.to_string();
                let created = stamp
                    .parse::<i64>()
                    .ok()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
                if let Some(chan) = self.channels.get_mut(&irc_to_lower(&channel)) {
                    chan.created_at = created;
                }
                self.refresh_bootstrap(&channel, out);
            }
            RPL_NOTOPIC | RPL_TOPIC => {
                let Some(channel) = msg.arg(1) else { return };
                let channel = channel.to_string();
                if let Some(chan) = self.channels.get_mut(&irc_to_lower(&channel)) {
                    chan.topic = if response == RPL_TOPIC {
                        Topic::Set(msg.tail.clone().unwrap_or_default())
                    } else {
                        Topic::Unset
                    };
                } else {
                    debug!(channel = %channel, "topic reply for untracked channel, skipping");
                }
                self.refresh_bootstrap(&channel, out);
            }
            RPL_NAMREPLY => {
                // [me, visibility, channel] with the names in the trailing.
                let Some(channel) = msg.args.last().filter(|a| a.is_channel_name()) else {
                    return;
                };
                let key = irc_to_lower(channel);
                let Some(chan) = self.channels.get_mut(&key) else {
                    debug!(channel = %channel, "NAMES for untracked channel, skipping");
                    return;
                };
                if !chan.updating_names() {
                    chan.begin_names();
                }
                if let Some(list) = &msg.tail {
                    for token in list.split(' ').filter(|t| !t.is_empty()) {
                        chan.add_names_entry(token, &self.caps);
                    }
                }
            }
            RPL_ENDOFNAMES => {
                let Some(channel) = msg.arg(1) else { return };
                let channel = channel.to_string();
                let Some(chan) = self.channels.get_mut(&irc_to_lower(&channel)) else {
                    return;
                };
                chan.end_names();
                self.emit(
                    Event::Names {
                        channel: channel.clone(),
                    },
                    out,
                );
                self.refresh_bootstrap(&channel, out);
            }
        }
    }

    fn handle_bad_nick(&mut self, code: u16, out: &mut Vec<EngineAction>) {
        if self.registered {
            // A rejected rename after registration: revert the local nick.
            self.my_nick = self.prev_nick.clone();
            return;
        }

        self.emit(Event::BadNick { code }, out);
        if !self.reactions.auto_renick {
            return;
        }
        let fallback = if code == Response::ERR_ERRONEUSNICKNAME.code() {
            self.profile
                .alternate
                .clone()
                .unwrap_or_else(|| format!("{}_", self.my_nick))
        } else {
            format!("{}_", self.my_nick)
        };
        self.note_nick(&fallback);
        out.push(EngineAction::SendNow(Message::nick(&fallback)));
    }

    /// Re-check a channel's bootstrap facts, emitting the completion
    /// event if the last one just arrived.
    fn refresh_bootstrap(&mut self, channel: &str, out: &mut Vec<EngineAction>) {
        let my_nick = self.my_nick.clone();
        let Some(chan) = self.channels.get_mut(&irc_to_lower(channel)) else {
            return;
        };
        if chan.try_complete(&my_nick) {
            let name = chan.name.clone();
            self.emit(Event::Channel { channel: name }, out);
        }
    }
}
