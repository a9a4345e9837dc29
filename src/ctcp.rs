//! Client-To-Client Protocol (CTCP) framing.
//!
//! CTCP rides inside PRIVMSG/NOTICE trailing text, wrapped in `\u{1}`
//! delimiters: `\u{1}VERB body\u{1}`. `ACTION` is the distinguished verb
//! behind `/me`.

/// The CTCP delimiter character.
pub const CTCP_DELIM: char = '\u{1}';

/// A decoded CTCP payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    /// The CTCP verb (e.g. `PING`, `VERSION`, `ACTION`), as received.
    pub verb: String,
    /// Everything after the verb, if anything.
    pub body: Option<String>,
}

impl Ctcp {
    /// Decode a PRIVMSG/NOTICE trailing segment as CTCP.
    ///
    /// Returns `None` unless the text is wrapped in `\u{1}` on both ends.
    pub fn parse(text: &str) -> Option<Ctcp> {
        let inner = text.strip_prefix(CTCP_DELIM)?.strip_suffix(CTCP_DELIM)?;

        let (verb, body) = match inner.split_once(' ') {
            Some((verb, body)) => (verb, Some(body.to_string())),
            None => (inner, None),
        };
        if verb.is_empty() {
            return None;
        }

        Some(Ctcp {
            verb: verb.to_string(),
            body,
        })
    }

    /// Whether this payload is a `/me` action.
    pub fn is_action(&self) -> bool {
        self.verb.eq_ignore_ascii_case("ACTION")
    }
}

/// Wrap a payload string in CTCP delimiters.
pub fn wrap(payload: &str) -> String {
    format!("{CTCP_DELIM}{payload}{CTCP_DELIM}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verb_and_body() {
        let ctcp = Ctcp::parse("\u{1}PING 1234567\u{1}").unwrap();
        assert_eq!(ctcp.verb, "PING");
        assert_eq!(ctcp.body.as_deref(), Some("1234567"));
    }

    #[test]
    fn parses_bare_verb() {
        let ctcp = Ctcp::parse("\u{1}VERSION\u{1}").unwrap();
        assert_eq!(ctcp.verb, "VERSION");
        assert_eq!(ctcp.body, None);
    }

    #[test]
    fn recognizes_action() {
        let ctcp = Ctcp::parse("\u{1}ACTION waves\u{1}").unwrap();
        assert!(ctcp.is_action());
        assert_eq!(ctcp.body.as_deref(), Some("waves"));
    }

    #[test]
    fn rejects_unwrapped_text() {
        assert_eq!(Ctcp::parse("hello"), None);
        assert_eq!(Ctcp::parse("\u{1}unterminated"), None);
        assert_eq!(Ctcp::parse(""), None);
    }

    #[test]
    fn wrap_round_trips() {
        let wrapped = wrap("PING 42");
        let ctcp = Ctcp::parse(&wrapped).unwrap();
        assert_eq!(ctcp.verb, "PING");
        assert_eq!(ctcp.body.as_deref(), Some("42"));
    }
}
