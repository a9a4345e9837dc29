//! Session lifecycle: connect, register, drive, reconnect.
//!
//! [`Session::connect`] spawns one driver task per session. The driver
//! owns the transport exclusively and interleaves three duties with
//! `select!`: reading lines (fed to the sans-IO [`Engine`]), executing
//! host commands, and releasing flood-scheduled writes when their slot
//! arrives. The engine itself sits behind a mutex shared with the
//! [`Session`] handle, which is how state accessors answer without a
//! round-trip through the driver.
//!
//! Disconnects surface as [`Event::Disconnected`]; when auto-reconnect is
//! configured the driver sleeps and dials again, cancelling the wait if
//! the caller disconnects explicitly. Lines queued when the connection
//! drops are discarded silently — their [`Receipt`]s resolve as
//! undelivered.

use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::ctcp;
use crate::dispatch::{BuiltinReactions, RawKey};
use crate::engine::{Engine, EngineAction, Profile};
use crate::event::Event;
use crate::hostmask::Identity;
use crate::line::LineCodec;
use crate::message::Message;
use crate::sender::{Outbox, OutboundLine};
use crate::transport::{self, Conn};
use crate::whois::WhoisRecord;

/// Session configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Server hostname or address.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Wrap the connection in TLS.
    pub tls: bool,
    /// Local address to bind before connecting (virtual host).
    pub local_address: Option<IpAddr>,
    /// Server password (PASS), if any.
    pub password: Option<String>,
    /// Desired nickname. Spaces are stripped.
    pub nickname: String,
    /// Fallback nickname for an erroneous-nick rejection.
    pub alternate_nickname: Option<String>,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Minimum spacing between flood-scheduled lines.
    pub flood_interval: Duration,
    /// Delay before reconnecting after a lost connection.
    /// [`Duration::ZERO`] disables auto-reconnect.
    pub reconnect_delay: Duration,
    /// Log every raw line in and out at debug level.
    pub wire_debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            server: String::new(),
            port: 6667,
            tls: false,
            local_address: None,
            password: None,
            nickname: "slirc".to_string(),
            alternate_nickname: None,
            username: "slirc".to_string(),
            realname: "slirc-client user".to_string(),
            flood_interval: Duration::from_millis(1000),
            reconnect_delay: Duration::from_secs(15),
            wire_debug: false,
        }
    }
}

impl SessionConfig {
    fn profile(&self) -> Profile {
        Profile {
            nickname: self.nickname.clone(),
            alternate: self.alternate_nickname.clone(),
            username: self.username.clone(),
            realname: self.realname.clone(),
            password: self.password.clone(),
        }
    }
}

/// Completion signal for one submitted line.
///
/// Resolves once the line has actually been written to the transport, not
/// merely queued. Dropping the receipt is fine; awaiting it after the
/// connection closed yields `false`.
#[derive(Debug)]
pub struct Receipt(oneshot::Receiver<()>);

impl Receipt {
    /// Wait until the line was written. Returns `false` if the line was
    /// discarded because the connection closed first.
    pub async fn delivered(self) -> bool {
        self.0.await.is_ok()
    }
}

/// Which hostmask fields a ban mask matches, and whether to follow up
/// with a kick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BanStyle {
    /// Match the nick instead of `*`.
    pub nick: bool,
    /// Match the username instead of `*`.
    pub user: bool,
    /// Match the hostname instead of `*`.
    pub host: bool,
    /// Kick the target after setting the ban.
    pub kick: bool,
}

impl Default for BanStyle {
    /// The common `*!user@host` mask, without a kick.
    fn default() -> Self {
        BanStyle {
            nick: false,
            user: true,
            host: true,
            kick: false,
        }
    }
}

impl BanStyle {
    /// Build the ban mask for a user.
    pub fn mask(&self, who: &Identity) -> String {
        format!(
            "{}!{}@{}",
            if self.nick { who.nick.as_str() } else { "*" },
            if self.user { who.username.as_str() } else { "*" },
            if self.host { who.hostname.as_str() } else { "*" },
        )
    }
}

enum DriverCommand {
    Send {
        message: Message,
        notify: Option<oneshot::Sender<()>>,
        immediate: bool,
    },
    Quit {
        message: Option<String>,
    },
    Disconnect,
}

/// Handle to a running session.
///
/// Cloneable; all commands route through the flood-controlled sender of
/// the driver task and return a [`Receipt`].
#[derive(Clone)]
pub struct Session {
    engine: Arc<Mutex<Engine>>,
    commands: mpsc::UnboundedSender<DriverCommand>,
}

impl Session {
    /// Spawn a session driver for this configuration.
    ///
    /// Must be called within a tokio runtime. Connection progress and
    /// everything the server does arrive on the returned event stream;
    /// connection failures are reported there too, never as a panic.
    pub fn connect(config: SessionConfig) -> (Session, mpsc::UnboundedReceiver<Event>) {
        let engine = Arc::new(Mutex::new(Engine::new(config.profile())));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(run(config, engine.clone(), events_tx, commands_rx));

        (
            Session {
                engine,
                commands: commands_tx,
            },
            events_rx,
        )
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().expect("engine state lock poisoned")
    }

    fn submit(&self, message: Message, immediate: bool) -> Receipt {
        let (tx, rx) = oneshot::channel();
        let _ = self.commands.send(DriverCommand::Send {
            message,
            notify: Some(tx),
            immediate,
        });
        Receipt(rx)
    }

    /// Send a raw message through the flood-controlled sender.
    pub fn send(&self, message: Message) -> Receipt {
        self.submit(message, false)
    }

    /// Change nickname.
    pub fn nick(&self, nick: &str) -> Receipt {
        self.engine().note_nick(nick);
        self.submit(Message::nick(nick), false)
    }

    /// Send a channel or private message.
    pub fn privmsg(&self, target: &str, text: &str) -> Receipt {
        self.submit(Message::privmsg(target, text), false)
    }

    /// Send a notice.
    pub fn notice(&self, target: &str, text: &str) -> Receipt {
        self.submit(Message::notice(target, text), false)
    }

    /// Send a CTCP query (e.g. `"PING 12345"`, `"VERSION"`).
    pub fn ctcp(&self, nick: &str, payload: &str) -> Receipt {
        self.submit(Message::privmsg(nick, &ctcp::wrap(payload)), false)
    }

    /// Send a CTCP reply.
    pub fn ctcp_reply(&self, nick: &str, payload: &str) -> Receipt {
        self.submit(Message::notice(nick, &ctcp::wrap(payload)), false)
    }

    /// Send a `/me` action.
    pub fn action(&self, target: &str, text: &str) -> Receipt {
        self.submit(
            Message::privmsg(target, &ctcp::wrap(&format!("ACTION {text}"))),
            false,
        )
    }

    /// Join a channel, with an optional key.
    pub fn join(&self, channel: &str, key: Option<&str>) -> Receipt {
        self.submit(Message::join(channel, key), false)
    }

    /// Part a channel, with an optional message.
    pub fn part(&self, channel: &str, message: Option<&str>) -> Receipt {
        self.submit(Message::part(channel, message), false)
    }

    /// Change channel modes.
    pub fn mode(&self, channel: &str, modes: &str, args: &[&str]) -> Receipt {
        self.submit(Message::mode(channel, modes, args), false)
    }

    /// Kick a member, with an optional reason.
    pub fn kick(&self, channel: &str, nick: &str, reason: Option<&str>) -> Receipt {
        self.submit(Message::kick(channel, nick, reason), false)
    }

    /// Ban a user by hostmask mask, optionally kicking them afterwards.
    pub fn ban(&self, channel: &str, who: &Identity, style: BanStyle) -> Receipt {
        let mask = style.mask(who);
        let receipt = self.submit(Message::mode(channel, "+b", &[&mask]), false);
        if style.kick {
            let _ = self.submit(Message::kick(channel, &who.nick, None), false);
        }
        receipt
    }

    /// Set the topic, or query it with `None`.
    pub fn topic(&self, channel: &str, topic: Option<&str>) -> Receipt {
        self.submit(Message::topic(channel, topic), false)
    }

    /// Request a NAMES refresh for a channel.
    pub fn names(&self, channel: &str) -> Receipt {
        self.submit(Message::names(channel), false)
    }

    /// Request WHOIS for a nick.
    pub fn whois(&self, nick: &str) -> Receipt {
        self.engine().begin_whois(nick);
        self.submit(Message::whois(nick), false)
    }

    /// Quit cleanly: sends QUIT, closes the connection and disables
    /// auto-reconnect.
    pub fn quit(&self, message: Option<&str>) {
        let _ = self.commands.send(DriverCommand::Quit {
            message: message.map(str::to_string),
        });
    }

    /// Drop the connection (or cancel a pending reconnect) without
    /// sending QUIT.
    pub fn disconnect(&self) {
        let _ = self.commands.send(DriverCommand::Disconnect);
    }

    /// Our current nickname.
    pub fn my_nick(&self) -> String {
        self.engine().my_nick().to_string()
    }

    /// Whether registration has completed on the current connection.
    pub fn is_registered(&self) -> bool {
        self.engine().is_registered()
    }

    /// Snapshot of one tracked channel.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.engine().channel(name).cloned()
    }

    /// Snapshot of all tracked channels.
    pub fn channels(&self) -> Vec<Channel> {
        self.engine().channels().cloned().collect()
    }

    /// Cached WHOIS record for a nick.
    pub fn whois_record(&self, nick: &str) -> Option<WhoisRecord> {
        self.engine().whois_record(nick).cloned()
    }

    /// Register a semantic event observer (runs on the driver task).
    pub fn observe(&self, observer: impl FnMut(&Event) + Send + 'static) {
        self.engine().dispatcher_mut().on_event(observer);
    }

    /// Register a raw message observer for a key.
    pub fn observe_raw(&self, key: RawKey, observer: impl FnMut(&Message) + Send + 'static) {
        self.engine().dispatcher_mut().on_raw(key, observer);
    }

    /// Replace the built-in reaction toggles.
    pub fn set_reactions(&self, reactions: BuiltinReactions) {
        self.engine().reactions = reactions;
    }
}

type Wire = SplitSink<Framed<Conn, LineCodec>, Message>;

fn lock(engine: &Arc<Mutex<Engine>>) -> MutexGuard<'_, Engine> {
    engine.lock().expect("engine state lock poisoned")
}

/// Deliver a driver-originated event to observers and the event stream.
fn deliver(engine: &Arc<Mutex<Engine>>, events: &mpsc::UnboundedSender<Event>, event: Event) {
    lock(engine).dispatcher_mut().emit(&event);
    let _ = events.send(event);
}

async fn write_line(sink: &mut Wire, message: Message, wire_debug: bool) -> std::io::Result<()> {
    if wire_debug {
        debug!(line = %message, "<<");
    }
    sink.send(message).await
}

/// Execute engine actions in order: forward events, queue flood-scheduled
/// sends, write immediate sends.
async fn execute_actions(
    actions: Vec<EngineAction>,
    sink: &mut Wire,
    outbox: &mut Outbox,
    events: &mpsc::UnboundedSender<Event>,
    wire_debug: bool,
) {
    for action in actions {
        match action {
            EngineAction::Emit(event) => {
                let _ = events.send(event);
            }
            EngineAction::Send(message) => outbox.push(OutboundLine {
                message,
                notify: None,
            }),
            EngineAction::SendNow(message) => {
                if let Err(e) = write_line(sink, message, wire_debug).await {
                    warn!(error = %e, "immediate write failed");
                }
            }
        }
    }
}

enum ConnectionOutcome {
    /// Connection lost; reconnect per configuration.
    Lost,
    /// Explicit quit/disconnect or handle dropped; stop the driver.
    Shutdown,
}

async fn run(
    config: SessionConfig,
    engine: Arc<Mutex<Engine>>,
    events: mpsc::UnboundedSender<Event>,
    mut commands: mpsc::UnboundedReceiver<DriverCommand>,
) {
    loop {
        let outcome = match transport::connect(
            &config.server,
            config.port,
            config.tls,
            config.local_address,
        )
        .await
        {
            Ok(conn) => drive_connection(&config, &engine, &events, &mut commands, conn).await,
            Err(error) => {
                warn!(server = %config.server, error = %error, "connect failed");
                let message = error.to_string();
                deliver(
                    &engine,
                    &events,
                    Event::Error {
                        message: message.clone(),
                    },
                );
                let actions = lock(&engine).on_disconnected(Some(message));
                for action in actions {
                    if let EngineAction::Emit(event) = action {
                        let _ = events.send(event);
                    }
                }
                ConnectionOutcome::Lost
            }
        };

        if matches!(outcome, ConnectionOutcome::Shutdown) || config.reconnect_delay.is_zero() {
            return;
        }

        info!(delay = ?config.reconnect_delay, "reconnecting after delay");
        let wait = tokio::time::sleep(config.reconnect_delay);
        tokio::pin!(wait);
        loop {
            tokio::select! {
                _ = &mut wait => break,
                cmd = commands.recv() => match cmd {
                    // An explicit disconnect cancels the pending reconnect.
                    Some(DriverCommand::Quit { .. }) | Some(DriverCommand::Disconnect) | None => {
                        return;
                    }
                    // Lines submitted while down are dropped silently.
                    Some(DriverCommand::Send { .. }) => {}
                },
            }
        }
    }
}

async fn drive_connection(
    config: &SessionConfig,
    engine: &Arc<Mutex<Engine>>,
    events: &mpsc::UnboundedSender<Event>,
    commands: &mut mpsc::UnboundedReceiver<DriverCommand>,
    conn: Conn,
) -> ConnectionOutcome {
    info!(server = %config.server, port = config.port, tls = conn.is_tls(), "connected");

    let framed = Framed::new(conn, LineCodec::new());
    let (mut sink, mut stream): (Wire, SplitStream<Framed<Conn, LineCodec>>) = framed.split();
    let mut outbox = Outbox::new(config.flood_interval);
    let mut staged: Option<(OutboundLine, Instant)> = None;

    let startup = lock(engine).on_connected();
    execute_actions(startup, &mut sink, &mut outbox, events, config.wire_debug).await;

    let mut last_error: Option<String> = None;
    let (shutdown, disconnect_error) = loop {
        if staged.is_none() {
            if let Some(line) = outbox.pop() {
                let at = outbox.reserve(Instant::now());
                staged = Some((line, at));
            }
        }
        let deadline = staged.as_ref().map(|(_, at)| *at);

        tokio::select! {
            biased;

            cmd = commands.recv() => match cmd {
                Some(DriverCommand::Send { message, notify, immediate }) => {
                    if immediate {
                        match write_line(&mut sink, message, config.wire_debug).await {
                            Ok(()) => {
                                if let Some(notify) = notify {
                                    let _ = notify.send(());
                                }
                            }
                            Err(e) => deliver(engine, events, Event::Error { message: e.to_string() }),
                        }
                    } else {
                        outbox.push(OutboundLine { message, notify });
                    }
                }
                Some(DriverCommand::Quit { message }) => {
                    let _ = write_line(&mut sink, Message::quit(message.as_deref()), config.wire_debug).await;
                    break (true, None);
                }
                Some(DriverCommand::Disconnect) | None => break (true, None),
            },

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((line, _)) = staged.take() {
                    let OutboundLine { message, notify } = line;
                    match write_line(&mut sink, message, config.wire_debug).await {
                        Ok(()) => {
                            if let Some(notify) = notify {
                                let _ = notify.send(());
                            }
                        }
                        Err(e) => deliver(engine, events, Event::Error { message: e.to_string() }),
                    }
                }
            }

            next = stream.next() => match next {
                Some(Ok(raw)) => {
                    if config.wire_debug {
                        debug!(line = %raw, ">>");
                    }
                    let actions = lock(engine).feed_line(&raw);
                    execute_actions(actions, &mut sink, &mut outbox, events, config.wire_debug).await;
                }
                Some(Err(error)) => {
                    // Not itself a teardown; the close that follows is.
                    last_error = Some(error.to_string());
                    deliver(engine, events, Event::Error { message: error.to_string() });
                }
                None => break (false, last_error.take()),
            },
        }
    };

    // Pending lines are dropped, not retried; their receipts resolve as
    // undelivered.
    outbox.clear();
    drop(staged);

    let actions = lock(engine).on_disconnected(disconnect_error);
    for action in actions {
        if let EngineAction::Emit(event) = action {
            let _ = events.send(event);
        }
    }

    if shutdown {
        ConnectionOutcome::Shutdown
    } else {
        ConnectionOutcome::Lost
    }
}
