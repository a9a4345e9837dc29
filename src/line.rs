//! CRLF line framing for the transport.
//!
//! The decoder reassembles protocol lines from arbitrary read boundaries:
//! a line is complete only at `\n`, an unterminated trailing fragment
//! stays buffered until the next read, and a chunk holding several
//! complete lines yields them all without spurious buffering. Blank lines
//! are skipped. Decoding is lossy UTF-8, so a stray non-UTF-8 byte
//! damages one line at most, never the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::message::Message;

/// Maximum bytes buffered while waiting for a line terminator.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Tokio codec framing IRC lines over a byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCodec;

impl LineCodec {
    /// Create a codec.
    pub fn new() -> LineCodec {
        LineCodec
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > MAX_IRC_LINE_LEN {
                    warn!(len = src.len(), "discarding oversized unterminated line");
                    src.clear();
                }
                return Ok(None);
            };

            let frame = src.split_to(pos + 1);
            let bytes = &frame[..frame.len() - 1];
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
            let line = String::from_utf8_lossy(bytes);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line.into_owned()));
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = std::io::Error;

    /// Serialize a message and append the CRLF terminator, exactly once
    /// per line.
    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = message.to_string();
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
