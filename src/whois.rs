//! WHOIS reply aggregation.
//!
//! A WHOIS answer arrives as a family of numeric replies that must be
//! merged into one record before it is useful. Records are keyed by the
//! target nick (not the requester), and an `updating` flag marks requests
//! still in flight: starting a fresh request replaces any stale partial
//! record wholesale, so an abandoned earlier request can never leak
//! fields into the new answer.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::casemap::irc_to_lower;
use crate::message::Message;
use crate::response::Response;

/// An aggregated WHOIS answer for one nick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhoisRecord {
    /// The target nick, as reported by the server.
    pub nick: String,
    /// Ident/username from RPL_WHOISUSER.
    pub username: Option<String>,
    /// Hostname from RPL_WHOISUSER.
    pub hostname: Option<String>,
    /// Real name from RPL_WHOISUSER.
    pub realname: Option<String>,
    /// Server the user is connected to.
    pub server: Option<String>,
    /// Free-text description of that server.
    pub server_info: Option<String>,
    /// Away message, if the user is away.
    pub away: Option<String>,
    /// Whether the user is an IRC operator.
    pub oper: bool,
    /// Seconds idle, from RPL_WHOISIDLE.
    pub idle_secs: Option<u64>,
    /// Sign-on time, from RPL_WHOISIDLE.
    pub signon: Option<DateTime<Utc>>,
    /// Channel list tokens, concatenated across repeated RPL_WHOISCHANNELS
    /// lines; entries keep their privilege prefix symbols as received.
    pub channels: Vec<String>,
    updating: bool,
}

impl WhoisRecord {
    fn new(nick: &str) -> WhoisRecord {
        WhoisRecord {
            nick: nick.to_string(),
            username: None,
            hostname: None,
            realname: None,
            server: None,
            server_info: None,
            away: None,
            oper: false,
            idle_secs: None,
            signon: None,
            channels: Vec::new(),
            updating: true,
        }
    }

    /// Whether a request for this nick is still in flight.
    pub fn is_updating(&self) -> bool {
        self.updating
    }
}

/// Accumulates WHOIS reply families into per-nick records.
#[derive(Clone, Debug, Default)]
pub struct WhoisTracker {
    records: HashMap<String, WhoisRecord>,
}

impl WhoisTracker {
    /// Start a request for a nick, discarding any cached or stale
    /// in-flight record.
    pub fn begin(&mut self, nick: &str) {
        self.records
            .insert(irc_to_lower(nick), WhoisRecord::new(nick));
    }

    /// Cached record lookup (finished or in flight).
    pub fn get(&self, nick: &str) -> Option<&WhoisRecord> {
        self.records.get(&irc_to_lower(nick))
    }

    /// Apply one WHOIS-family numeric. Returns the completed record when
    /// the numeric was the end-of-WHOIS terminator.
    pub fn apply(&mut self, response: Response, msg: &Message) -> Option<WhoisRecord> {
        // args are [requester, target-nick, ...]
        let nick = msg.arg(1)?;
        let key = irc_to_lower(nick);

        // RPL_WHOISUSER opens the reply family; anything else only
        // touches a record we already hold, so an unsolicited RPL_AWAY
        // (sent outside WHOIS when messaging an away user) cannot
        // resurrect a finished record.
        if response == Response::RPL_WHOISUSER {
            self.records
                .entry(key.clone())
                .or_insert_with(|| WhoisRecord::new(nick));
        }
        let record = self.records.get_mut(&key)?;

        match response {
            Response::RPL_WHOISUSER => {
                record.username = msg.arg(2).map(str::to_string);
                record.hostname = msg.arg(3).map(str::to_string);
                record.realname = msg.tail.clone();
            }
            Response::RPL_WHOISSERVER => {
                record.server = msg.arg(2).map(str::to_string);
                record.server_info = msg.tail.clone();
            }
            Response::RPL_AWAY => {
                if record.updating {
                    record.away = msg.tail.clone();
                }
            }
            Response::RPL_WHOISOPERATOR => {
                record.oper = true;
            }
            Response::RPL_WHOISIDLE => {
                record.idle_secs = msg.arg(2).and_then(|s| s.parse().ok());
                record.signon = msg
                    .arg(3)
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
            }
            Response::RPL_WHOISCHANNELS => {
                if let Some(list) = &msg.tail {
                    record
                        .channels
                        .extend(list.split(' ').filter(|t| !t.is_empty()).map(str::to_string));
                }
            }
            Response::RPL_ENDOFWHOIS => {
                record.updating = false;
                return Some(record.clone());
            }
            _ => {}
        }
        None
    }
}
