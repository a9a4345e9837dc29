//! Server capability advertisement (RPL_ISUPPORT) tracking.
//!
//! The engine cares about two tokens: `PREFIX`, which maps privilege mode
//! letters to the symbols shown before nicks, and `CHANMODES`, which
//! sorts channel mode letters into the four argument-consumption classes
//! the mode-delta algorithm depends on. Sensible defaults apply until the
//! server advertises its own values, so capability queries are always
//! answerable.

/// How a channel mode letter consumes arguments in a MODE change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeClass {
    /// Type A: unbounded list entries (bans etc.); always takes a
    /// parameter, never tracked as a channel attribute.
    List,
    /// Type B: takes a parameter both when set and when unset.
    AlwaysParam,
    /// Type C: takes a parameter only when being set.
    ParamWhenSet,
    /// Type D: never takes a parameter.
    NoParam,
    /// A privilege mode from the `PREFIX` table; takes a nick argument.
    Prefix,
    /// Not advertised in any class; treated as a plain boolean toggle.
    Unknown,
}

/// The `PREFIX=(modes)symbols` token, split into its two halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    /// Mode letters, highest privilege first.
    pub modes: &'a str,
    /// Display symbols, in the same order.
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    /// Parse a `PREFIX` value such as `(qaohv)~&@%+`.
    pub fn parse(s: &'a str) -> Option<Self> {
        if let Some(open) = s.find('(') {
            if let Some(close) = s[open + 1..].find(')') {
                let close = open + 1 + close;
                let modes = &s[open + 1..close];
                let prefixes = &s[close + 1..];
                if !modes.is_empty() && !prefixes.is_empty() {
                    return Some(PrefixSpec { modes, prefixes });
                }
            }
        }
        None
    }
}

/// The `CHANMODES=A,B,C,D` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    pub a: &'a str,
    pub b: &'a str,
    pub c: &'a str,
    pub d: &'a str,
}

impl<'a> ChanModes<'a> {
    /// Parse a `CHANMODES` value such as `b,k,l,imnpst`.
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut parts = s.splitn(4, ',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes { a, b, c, d })
    }
}

/// Derived per-session capability state.
///
/// Invariant: a prefix mode letter never simultaneously appears in any of
/// the four `CHANMODES` classes; whichever token arrives later wins the
/// letter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityTable {
    /// `(mode letter, prefix symbol)` pairs, highest privilege first.
    /// Order is the tie-break for computing a user's displayed prefix.
    prefix_modes: Vec<(char, char)>,
    list_modes: Vec<char>,
    always_param: Vec<char>,
    param_when_set: Vec<char>,
    no_param: Vec<char>,
}

impl Default for CapabilityTable {
    /// Defaults used until the server advertises: the common
    /// `(qaohv)~&@%+` prefix table and empty mode classes.
    fn default() -> Self {
        CapabilityTable {
            prefix_modes: vec![('q', '~'), ('a', '&'), ('o', '@'), ('h', '%'), ('v', '+')],
            list_modes: Vec::new(),
            always_param: Vec::new(),
            param_when_set: Vec::new(),
            no_param: Vec::new(),
        }
    }
}

impl CapabilityTable {
    /// Apply the tokens of one RPL_ISUPPORT line (the arguments after the
    /// client nick; the trailing "are supported" text is not a token).
    pub fn apply_isupport<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>) {
        for token in tokens {
            let (key, value) = match token.find('=') {
                Some(eq) => (&token[..eq], &token[eq + 1..]),
                None => (token, ""),
            };
            if key.eq_ignore_ascii_case("PREFIX") {
                if let Some(spec) = PrefixSpec::parse(value) {
                    self.set_prefixes(&spec);
                }
            } else if key.eq_ignore_ascii_case("CHANMODES") {
                if let Some(modes) = ChanModes::parse(value) {
                    self.set_chanmodes(&modes);
                }
            }
        }
    }

    fn set_prefixes(&mut self, spec: &PrefixSpec<'_>) {
        self.prefix_modes = spec.modes.chars().zip(spec.prefixes.chars()).collect();
        for (mode, _) in self.prefix_modes.clone() {
            self.remove_from_classes(mode);
        }
    }

    fn set_chanmodes(&mut self, modes: &ChanModes<'_>) {
        let not_prefix = |letters: &str, table: &[(char, char)]| -> Vec<char> {
            letters
                .chars()
                .filter(|c| !table.iter().any(|(m, _)| m == c))
                .collect()
        };
        self.list_modes = not_prefix(modes.a, &self.prefix_modes);
        self.always_param = not_prefix(modes.b, &self.prefix_modes);
        self.param_when_set = not_prefix(modes.c, &self.prefix_modes);
        self.no_param = not_prefix(modes.d, &self.prefix_modes);
    }

    fn remove_from_classes(&mut self, letter: char) {
        self.list_modes.retain(|&c| c != letter);
        self.always_param.retain(|&c| c != letter);
        self.param_when_set.retain(|&c| c != letter);
        self.no_param.retain(|&c| c != letter);
    }

    /// Classify a mode letter for the mode-delta algorithm.
    pub fn classify(&self, letter: char) -> ModeClass {
        if self.list_modes.contains(&letter) {
            ModeClass::List
        } else if self.always_param.contains(&letter) {
            ModeClass::AlwaysParam
        } else if self.param_when_set.contains(&letter) {
            ModeClass::ParamWhenSet
        } else if self.no_param.contains(&letter) {
            ModeClass::NoParam
        } else if self.prefix_modes.iter().any(|(m, _)| *m == letter) {
            ModeClass::Prefix
        } else {
            ModeClass::Unknown
        }
    }

    /// The ordered `(mode, symbol)` prefix table.
    pub fn prefix_modes(&self) -> &[(char, char)] {
        &self.prefix_modes
    }

    /// Whether a character is one of the advertised prefix symbols.
    pub fn is_prefix_symbol(&self, symbol: char) -> bool {
        self.prefix_modes.iter().any(|(_, s)| *s == symbol)
    }

    /// The mode letter displayed as the given symbol.
    pub fn mode_for_symbol(&self, symbol: char) -> Option<char> {
        self.prefix_modes
            .iter()
            .find(|(_, s)| *s == symbol)
            .map(|(m, _)| *m)
    }

    /// The displayed prefix for a set of held privilege modes: the symbol
    /// of the first (highest) entry in the prefix table the user holds.
    pub fn highest_prefix(&self, access: &[char]) -> Option<char> {
        self.prefix_modes
            .iter()
            .find(|(m, _)| access.contains(m))
            .map(|(_, s)| *s)
    }
}
