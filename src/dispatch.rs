//! Event routing.
//!
//! Two observer tiers exist. Raw observers subscribe to a [`RawKey`] —
//! a lowercased command verb, any numeric, or a numeric leading-digit
//! bucket — and see every matching decoded [`Message`]. Event observers
//! see every semantic [`Event`]. Built-in protocol reactions (auto-PONG
//! and friends) are not observers: they are a fixed part of the engine,
//! each individually disabled through [`BuiltinReactions`] when a caller
//! wants to replace the behavior.

use crate::event::Event;
use crate::message::Message;

/// Subscription key for raw message observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawKey {
    /// A command verb, matched case-insensitively (stored lowercased).
    Command(String),
    /// Any 3-digit numeric reply.
    AnyNumeric,
    /// Numerics sharing a leading digit (e.g. `4` for 400–499).
    ///
    /// Bucketing is purely by first digit, the protocol convention:
    /// 001–099 and 300–399 are distinct buckets.
    NumericClass(u8),
}

impl RawKey {
    /// Key for a command verb.
    pub fn command(verb: &str) -> RawKey {
        RawKey::Command(verb.to_ascii_lowercase())
    }

    fn matches(&self, msg: &Message, numeric: Option<u16>) -> bool {
        match self {
            RawKey::Command(verb) => msg.command.eq_ignore_ascii_case(verb),
            RawKey::AnyNumeric => numeric.is_some(),
            RawKey::NumericClass(digit) => numeric.is_some_and(|n| n / 100 == u16::from(*digit)),
        }
    }
}

/// Toggles for the engine's built-in protocol reactions.
///
/// All default to enabled. Disabling one suppresses only the engine's
/// corrective action; the triggering message still reaches observers, so
/// a caller can substitute its own behavior completely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinReactions {
    /// Answer server PING with PONG.
    pub auto_pong: bool,
    /// Answer CTCP PING queries.
    pub auto_ctcp_ping: bool,
    /// Answer CTCP TIME queries with the local time.
    pub auto_ctcp_time: bool,
    /// Retry with a fallback nick when registration is rejected.
    pub auto_renick: bool,
}

impl Default for BuiltinReactions {
    fn default() -> Self {
        BuiltinReactions {
            auto_pong: true,
            auto_ctcp_ping: true,
            auto_ctcp_time: true,
            auto_renick: true,
        }
    }
}

type RawObserver = Box<dyn FnMut(&Message) + Send>;
type EventObserver = Box<dyn FnMut(&Event) + Send>;

/// Ordered observer registry for one session.
#[derive(Default)]
pub struct Dispatcher {
    raw: Vec<(RawKey, RawObserver)>,
    observers: Vec<EventObserver>,
}

impl Dispatcher {
    /// Register a raw observer for a key. Observers run in registration
    /// order.
    pub fn on_raw(&mut self, key: RawKey, observer: impl FnMut(&Message) + Send + 'static) {
        self.raw.push((key, Box::new(observer)));
    }

    /// Register a semantic event observer.
    pub fn on_event(&mut self, observer: impl FnMut(&Event) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Route one decoded message to the matching raw observers.
    pub fn dispatch_raw(&mut self, msg: &Message) {
        let numeric = msg.numeric();
        for (key, observer) in &mut self.raw {
            if key.matches(msg, numeric) {
                observer(msg);
            }
        }
    }

    /// Deliver one semantic event to every event observer.
    pub fn emit(&mut self, event: &Event) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("raw_observers", &self.raw.len())
            .field("event_observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let reader = {
            let count = count.clone();
            move || count.load(Ordering::SeqCst)
        };
        (count, reader)
    }

    #[test]
    fn verb_key_is_case_insensitive() {
        let mut dispatcher = Dispatcher::default();
        let (count, hits) = counter();
        dispatcher.on_raw(RawKey::command("PING"), move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch_raw(&Message::parse("ping :x"));
        dispatcher.dispatch_raw(&Message::parse("PING :y"));
        dispatcher.dispatch_raw(&Message::parse("PONG :z"));
        assert_eq!(hits(), 2);
    }

    #[test]
    fn numeric_buckets() {
        let mut dispatcher = Dispatcher::default();
        let (any_count, any_hits) = counter();
        let (four_count, four_hits) = counter();
        dispatcher.on_raw(RawKey::AnyNumeric, move |_| {
            any_count.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.on_raw(RawKey::NumericClass(4), move |_| {
            four_count.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch_raw(&Message::parse(":s 001 me :hi"));
        dispatcher.dispatch_raw(&Message::parse(":s 433 me n :in use"));
        dispatcher.dispatch_raw(&Message::parse(":s 482 me #c :not op"));
        dispatcher.dispatch_raw(&Message::parse("PING :x"));

        assert_eq!(any_hits(), 3);
        assert_eq!(four_hits(), 2);
    }

    #[test]
    fn observers_run_in_registration_order() {
        let mut dispatcher = Dispatcher::default();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = log.clone();
            dispatcher.on_event(move |_| log.lock().unwrap().push(tag));
        }

        dispatcher.emit(&Event::Registered);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn reactions_default_on() {
        let reactions = BuiltinReactions::default();
        assert!(reactions.auto_pong);
        assert!(reactions.auto_ctcp_ping);
        assert!(reactions.auto_ctcp_time);
        assert!(reactions.auto_renick);
    }
}
