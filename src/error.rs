//! Error types
//!
//! Transport failures and protocol violations are both terminal for the
//! connection they occur on. `Rejected` carries the text of an `err` reply
//! and is only produced on the client side.

use crate::protocol::message::Tag;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read or write on the underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream
    #[error("Connection closed")]
    ConnectionClosed,

    /// Wire format violation
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Peer answered a request with `err:<text>`
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Peer answered with a tag the request does not allow
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(Tag),
}

/// Wire format violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Line has no `:` separating tag and payload
    #[error("missing ':' delimiter")]
    MissingDelimiter,

    /// Text before the first `:` is not a known tag
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// No line terminator within the framing limit
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// Line is not valid UTF-8
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// Payload longer than the protocol allows
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLong { len: usize, max: usize },

    /// Payload contains a line terminator
    #[error("payload contains a line terminator")]
    EmbeddedTerminator,

    /// Delivery payload is not `room:sender:text`
    #[error("malformed delivery payload")]
    MalformedDelivery,
}

impl Error {
    /// True when the peer is gone rather than misbehaving
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::ConnectionClosed | Error::Io(_))
    }
}
