//! Numeric replies consumed by the client engine.
//!
//! Only the numerics the session state machine reacts to are named here;
//! everything else is still observable through the raw dispatch buckets.

/// Named numeric reply codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
#[repr(u16)]
pub enum Response {
    /// `001` — welcome, first registration confirmation.
    RPL_WELCOME = 1,
    /// `004` — server/version/modes summary, ends the welcome burst.
    RPL_MYINFO = 4,
    /// `005` — ISUPPORT capability advertisement.
    RPL_ISUPPORT = 5,
    /// `301` — away message.
    RPL_AWAY = 301,
    /// `311` — WHOIS user info.
    RPL_WHOISUSER = 311,
    /// `312` — WHOIS server.
    RPL_WHOISSERVER = 312,
    /// `313` — WHOIS operator flag.
    RPL_WHOISOPERATOR = 313,
    /// `317` — WHOIS idle/signon times.
    RPL_WHOISIDLE = 317,
    /// `318` — end of WHOIS.
    RPL_ENDOFWHOIS = 318,
    /// `319` — WHOIS channel list (may repeat).
    RPL_WHOISCHANNELS = 319,
    /// `324` — channel mode summary.
    RPL_CHANNELMODEIS = 324,
    /// `329` — channel creation time.
    RPL_CREATIONTIME = 329,
    /// `331` — no topic is set.
    RPL_NOTOPIC = 331,
    /// `332` — channel topic.
    RPL_TOPIC = 332,
    /// `353` — NAMES reply line.
    RPL_NAMREPLY = 353,
    /// `366` — end of NAMES.
    RPL_ENDOFNAMES = 366,
    /// `376` — end of MOTD.
    RPL_ENDOFMOTD = 376,
    /// `422` — no MOTD available.
    ERR_NOMOTD = 422,
    /// `432` — erroneous nickname.
    ERR_ERRONEUSNICKNAME = 432,
    /// `433` — nickname already in use.
    ERR_NICKNAMEINUSE = 433,
}

impl Response {
    /// Look up a numeric code.
    pub fn from_code(code: u16) -> Option<Response> {
        use Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            4 => RPL_MYINFO,
            5 => RPL_ISUPPORT,
            301 => RPL_AWAY,
            311 => RPL_WHOISUSER,
            312 => RPL_WHOISSERVER,
            313 => RPL_WHOISOPERATOR,
            317 => RPL_WHOISIDLE,
            318 => RPL_ENDOFWHOIS,
            319 => RPL_WHOISCHANNELS,
            324 => RPL_CHANNELMODEIS,
            329 => RPL_CREATIONTIME,
            331 => RPL_NOTOPIC,
            332 => RPL_TOPIC,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            376 => RPL_ENDOFMOTD,
            422 => ERR_NOMOTD,
            432 => ERR_ERRONEUSNICKNAME,
            433 => ERR_NICKNAMEINUSE,
            _ => return None,
        })
    }

    /// The numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for code in [1u16, 4, 5, 301, 311, 318, 324, 329, 353, 366, 376, 422, 433] {
            let resp = Response::from_code(code).unwrap();
            assert_eq!(resp.code(), code);
        }
        assert!(Response::from_code(999).is_none());
    }
}
