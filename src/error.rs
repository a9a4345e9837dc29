//! Error types for the IRC client engine.
//!
//! Protocol-level failures are deliberately rare here: the line codec
//! degrades malformed input to a best-effort [`Message`](crate::Message)
//! instead of failing, and state trackers skip inconsistent deltas rather
//! than erroring, so most variants concern the transport boundary.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The session driver is no longer running.
    #[error("session closed")]
    SessionClosed,

    /// A line was dropped before it could be written (connection closed).
    #[error("line dropped before write")]
    Dropped,

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
///
/// Decoding is lenient by design; the only hard failure is input with no
/// content at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,
}
