//! # slirc-client
//!
//! A stateful IRC client protocol engine: it turns the raw byte stream
//! from a TCP/TLS connection into structured events, tracks derived
//! session state (current nick, joined channels, membership and access
//! levels, topics, server capabilities), and serializes commands back
//! into protocol lines under anti-flood rate limiting.
//!
//! ## Features
//!
//! - Lenient line codec with fragment reassembly
//! - Semantic event stream (messages, joins, modes, topics, WHOIS, ...)
//! - Channel state machine with NAMES/MODE/TOPIC bootstrap aggregation
//! - Server-advertised mode semantics (`PREFIX`, `CHANMODES`)
//! - Flood-controlled, order-preserving outbound scheduling
//! - Auto-reconnecting session driver (Tokio, behind the `tokio` feature)

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ```no_run
//! use slirc_client::{Event, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SessionConfig {
//!         server: "irc.libera.chat".to_string(),
//!         nickname: "example_bot".to_string(),
//!         ..SessionConfig::default()
//!     };
//!
//!     let (session, mut events) = Session::connect(config);
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::Registered => {
//!                 session.join("#example", None);
//!             }
//!             Event::Message { sender, channel, text } => {
//!                 println!("<{}:{}> {}", channel, sender.nick, text);
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! The protocol core is sans-IO: [`Engine`] consumes decoded lines and
//! produces actions and events without touching a socket, so every piece
//! of state logic is testable offline. The Tokio [`Session`] driver is
//! the only component that owns a transport.
//!
//! ## Acknowledgments
//!
//! The wire behavior follows the conventions of the
//! [node-internet-relay-chat](https://github.com/DoctorMcKay/node-internet-relay-chat)
//! client library; the protocol handling is shared lineage with
//! [slirc-proto](https://github.com/sid3xyz/slirc-proto).

pub mod casemap;
pub mod chan;
pub mod channel;
pub mod ctcp;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod hostmask;
pub mod isupport;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod mode;
pub mod response;
#[cfg(feature = "tokio")]
pub mod sender;
#[cfg(feature = "tokio")]
pub mod session;
#[cfg(feature = "tokio")]
pub mod transport;
pub mod whois;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::channel::{Channel, ChannelUser, Topic};
pub use self::ctcp::Ctcp;
pub use self::dispatch::{BuiltinReactions, Dispatcher, RawKey};
pub use self::engine::{Engine, EngineAction, Profile};
pub use self::error::{ClientError, MessageParseError, Result};
pub use self::event::Event;
pub use self::hostmask::Identity;
pub use self::isupport::{CapabilityTable, ChanModes, ModeClass, PrefixSpec};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, MAX_IRC_LINE_LEN};
pub use self::message::Message;
pub use self::mode::{parse_mode_delta, ModeChange};
pub use self::response::Response;
#[cfg(feature = "tokio")]
pub use self::sender::FloodSchedule;
#[cfg(feature = "tokio")]
pub use self::session::{BanStyle, Receipt, Session, SessionConfig};
#[cfg(feature = "tokio")]
pub use self::transport::Conn;
pub use self::whois::{WhoisRecord, WhoisTracker};
