//! Nom-based IRC line parser.
//!
//! Splits one raw protocol line into prefix, command, middle arguments
//! and the trailing segment. Parsing is lenient: input that does not
//! match the grammar degrades to a best-effort result instead of an
//! error, because a single garbled line must never cost the connection.

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::opt,
    error::{context, VerboseError},
    sequence::preceded,
    IResult,
};

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse the message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

/// Parse the command token (verb or 3-digit numeric).
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context("parsing IRC command", take_while1(|c: char| c != ' '))(input)
}

/// A raw line split into its components, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub args: Vec<&'a str>,
    pub tail: Option<&'a str>,
}

/// Split a raw IRC line.
///
/// Line format:
/// ```text
/// [:prefix ] COMMAND [arg]* [ :tail]
/// ```
///
/// Runs of spaces between tokens act as a single separator; empty
/// argument tokens are never produced. A trailing segment starts at the
/// first argument position whose token begins with `:`. An input with no
/// command tokens yields an empty command rather than failing.
pub(crate) fn split_line(input: &str) -> RawLine<'_> {
    let input = input.trim_end_matches(['\r', '\n']);

    let (rest, prefix) = match opt(parse_prefix)(input) {
        Ok((rest, prefix)) => (rest, prefix),
        Err(_) => (input, None),
    };
    let rest = rest.trim_start_matches(' ');

    // Lenient degenerate form: nothing but a trailing segment left.
    if let Some(tail) = rest.strip_prefix(':') {
        return RawLine {
            prefix,
            command: "",
            args: Vec::new(),
            tail: Some(tail),
        };
    }

    let (mut rest, command) = match parse_command(rest) {
        Ok((rest, command)) => (rest, command),
        Err(_) => ("", ""),
    };

    let mut args = Vec::new();
    let mut tail = None;
    while let Some(stripped) = rest.strip_prefix(' ') {
        rest = stripped;
        if rest.starts_with(' ') {
            continue;
        }
        if let Some(t) = rest.strip_prefix(':') {
            tail = Some(t);
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        args.push(&rest[..end]);
        rest = &rest[end..];
    }

    RawLine {
        prefix,
        command,
        args,
        tail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        let line = split_line("PING");
        assert_eq!(line.command, "PING");
        assert!(line.prefix.is_none());
        assert!(line.args.is_empty());
        assert!(line.tail.is_none());
    }

    #[test]
    fn test_command_with_trailing() {
        let line = split_line("PRIVMSG #channel :Hello, world!");
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.args, vec!["#channel"]);
        assert_eq!(line.tail, Some("Hello, world!"));
    }

    #[test]
    fn test_with_prefix() {
        let line = split_line(":nick!user@host PRIVMSG #channel :Hello");
        assert_eq!(line.prefix, Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.args, vec!["#channel"]);
        assert_eq!(line.tail, Some("Hello"));
    }

    #[test]
    fn test_with_crlf() {
        let line = split_line("PING :server\r\n");
        assert_eq!(line.command, "PING");
        assert_eq!(line.tail, Some("server"));
    }

    #[test]
    fn test_multiple_args() {
        let line = split_line("USER guest 0 * :Real Name");
        assert_eq!(line.command, "USER");
        assert_eq!(line.args, vec!["guest", "0", "*"]);
        assert_eq!(line.tail, Some("Real Name"));
    }

    #[test]
    fn test_numeric_response() {
        let line = split_line(":server 001 nick :Welcome");
        assert_eq!(line.prefix, Some("server"));
        assert_eq!(line.command, "001");
        assert_eq!(line.args, vec!["nick"]);
        assert_eq!(line.tail, Some("Welcome"));
    }

    #[test]
    fn test_empty_trailing() {
        let line = split_line("PRIVMSG #channel :");
        assert_eq!(line.args, vec!["#channel"]);
        assert_eq!(line.tail, Some(""));
    }

    #[test]
    fn test_absent_trailing_is_distinguished() {
        let line = split_line("PRIVMSG #channel");
        assert_eq!(line.tail, None);
    }

    #[test]
    fn test_repeated_spaces_collapse() {
        let line = split_line("MODE  #chan   +o  nick");
        assert_eq!(line.command, "MODE");
        assert_eq!(line.args, vec!["#chan", "+o", "nick"]);
    }

    #[test]
    fn test_prefix_only_degrades() {
        let line = split_line(":irc.example.com");
        assert_eq!(line.prefix, Some("irc.example.com"));
        assert_eq!(line.command, "");
        assert!(line.args.is_empty());
    }

    #[test]
    fn test_colon_inside_arg_is_not_trailing() {
        let line = split_line("MODE #chan +b nick!u@host:1");
        assert_eq!(line.args, vec!["#chan", "+b", "nick!u@host:1"]);
        assert_eq!(line.tail, None);
    }

    #[test]
    fn test_bare_leading_colon_after_prefix() {
        let line = split_line(":server :only a tail");
        assert_eq!(line.prefix, Some("server"));
        assert_eq!(line.command, "");
        assert_eq!(line.tail, Some("only a tail"));
    }
}
