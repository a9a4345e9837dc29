//! Channel mode-delta parsing.
//!
//! A MODE change is a mode string (`+o-v`) followed by positional
//! arguments. How many arguments each letter consumes depends on the
//! server's advertised [`CapabilityTable`]; getting the classification
//! wrong desynchronizes every later argument in the same delta, so the
//! scan is strictly left to right with one shared argument cursor.

use crate::isupport::{CapabilityTable, ModeClass};

/// One decoded entry of a MODE delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModeChange {
    /// A privilege (prefix) mode granted to or revoked from a nick.
    Access {
        set: bool,
        mode: char,
        nick: String,
    },
    /// A list-class entry (ban/exception masks); consumes its argument
    /// but is not tracked as a channel attribute.
    List {
        set: bool,
        mode: char,
        mask: Option<String>,
    },
    /// A channel attribute mode, with its value when the class takes one.
    Channel {
        set: bool,
        mode: char,
        value: Option<String>,
    },
}

/// Scan a mode string and its arguments into typed changes.
///
/// `+`/`-` toggle the direction for the letters that follow; letters
/// before any toggle are treated as being set. Letters whose class
/// requires an argument that is missing are skipped (the rest of the
/// delta still applies with the arguments that remain).
pub fn parse_mode_delta(
    caps: &CapabilityTable,
    mode_string: &str,
    args: &[&str],
) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let mut args = args.iter().copied();
    let mut set = true;

    for c in mode_string.chars() {
        match c {
            '+' => set = true,
            '-' => set = false,
            _ => match caps.classify(c) {
                ModeClass::List => {
                    changes.push(ModeChange::List {
                        set,
                        mode: c,
                        mask: args.next().map(str::to_string),
                    });
                }
                ModeClass::AlwaysParam => match args.next() {
                    Some(value) => changes.push(ModeChange::Channel {
                        set,
                        mode: c,
                        value: Some(value.to_string()),
                    }),
                    None => continue,
                },
                ModeClass::ParamWhenSet => {
                    let value = if set { args.next() } else { None };
                    if set && value.is_none() {
                        continue;
                    }
                    changes.push(ModeChange::Channel {
                        set,
                        mode: c,
                        value: value.map(str::to_string),
                    });
                }
                ModeClass::Prefix => match args.next() {
                    Some(nick) => changes.push(ModeChange::Access {
                        set,
                        mode: c,
                        nick: nick.to_string(),
                    }),
                    None => continue,
                },
                ModeClass::NoParam | ModeClass::Unknown => {
                    changes.push(ModeChange::Channel {
                        set,
                        mode: c,
                        value: None,
                    });
                }
            },
        }
    }

    changes
}
