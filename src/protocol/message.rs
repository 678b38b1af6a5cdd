//! Wire messages
//!
//! Every message is a single line of the form `tag:payload\n`. Only the first
//! colon separates the tag; the payload may contain further colons.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

use super::constants::{DELIMITER, MAX_LEN};

/// Message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Log in as a publisher (`slogin`)
    LoginPublish,
    /// Log in as a subscriber (`rlogin`)
    LoginSubscribe,
    /// Join a room
    Join,
    /// Leave the current room
    Leave,
    /// Broadcast text to the current room (`sendall`)
    SendAll,
    /// End the session
    Quit,
    /// Request succeeded
    Ok,
    /// Request failed; payload explains why
    Err,
    /// Broadcast text delivered to a subscriber
    Delivery,
}

impl Tag {
    /// All tags, in wire-table order
    pub const ALL: [Tag; 9] = [
        Tag::LoginPublish,
        Tag::LoginSubscribe,
        Tag::Join,
        Tag::Leave,
        Tag::SendAll,
        Tag::Quit,
        Tag::Ok,
        Tag::Err,
        Tag::Delivery,
    ];

    /// Canonical wire symbol
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::LoginPublish => "slogin",
            Tag::LoginSubscribe => "rlogin",
            Tag::Join => "join",
            Tag::Leave => "leave",
            Tag::SendAll => "sendall",
            Tag::Quit => "quit",
            Tag::Ok => "ok",
            Tag::Err => "err",
            Tag::Delivery => "delivery",
        }
    }

    /// Whether this tag opens a session
    pub fn is_login(self) -> bool {
        matches!(self, Tag::LoginPublish | Tag::LoginSubscribe)
    }
}

impl FromStr for Tag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        Tag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownTag(s.to_string()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tag: Tag,
    pub payload: String,
}

impl Message {
    /// Create a message
    pub fn new(tag: Tag, payload: impl Into<String>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// Empty `ok` reply
    pub fn ok() -> Self {
        Self::new(Tag::Ok, "")
    }

    /// `err` reply with explanatory text
    pub fn err(text: impl Into<String>) -> Self {
        Self::new(Tag::Err, text)
    }

    /// Delivery of `text` sent by `sender` in `room`
    pub fn delivery(room: &str, sender: &str, text: &str) -> Self {
        Self::new(Tag::Delivery, delivery_payload(room, sender, text))
    }

    /// Serialize to a terminated wire line
    ///
    /// The payload is written verbatim; callers must not pass a payload
    /// containing a line terminator (see [`Message::validate`]).
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(self.tag.as_str().len() + self.payload.len() + 2);
        line.push_str(self.tag.as_str());
        line.push(DELIMITER);
        line.push_str(&self.payload);
        line.push('\n');
        line
    }

    /// Parse a wire line
    ///
    /// Trailing CR/LF characters are ignored. Fails if there is no colon or
    /// the text before the first colon is not a known tag.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (tag, payload) = line
            .split_once(DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter)?;

        Ok(Self {
            tag: tag.parse()?,
            payload: payload.to_string(),
        })
    }

    /// Check the payload against the protocol bounds
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.payload.contains(['\r', '\n']) {
            return Err(ProtocolError::EmbeddedTerminator);
        }
        if self.payload.len() > MAX_LEN {
            return Err(ProtocolError::PayloadTooLong {
                len: self.payload.len(),
                max: MAX_LEN,
            });
        }
        Ok(())
    }
}

/// Format a delivery payload: `room:sender:text`
pub fn delivery_payload(room: &str, sender: &str, text: &str) -> String {
    let mut payload = String::with_capacity(room.len() + sender.len() + text.len() + 2);
    payload.push_str(room);
    payload.push(DELIMITER);
    payload.push_str(sender);
    payload.push(DELIMITER);
    payload.push_str(text);
    payload
}

/// Length of the delivery payload for the given parts, without building it
pub fn delivery_payload_len(room: &str, sender: &str, text: &str) -> usize {
    room.len() + sender.len() + text.len() + 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let msg = Message::new(Tag::SendAll, "hello there");
        assert_eq!(msg.encode(), "sendall:hello there\n");

        assert_eq!(Message::ok().encode(), "ok:\n");
        assert_eq!(Message::err("Not in a room").encode(), "err:Not in a room\n");
    }

    #[test]
    fn test_decode_all_tags() {
        for tag in Tag::ALL {
            let line = format!("{}:payload\n", tag.as_str());
            let msg = Message::decode(&line).unwrap();
            assert_eq!(msg.tag, tag);
            assert_eq!(msg.payload, "payload");
        }
    }

    #[test]
    fn test_round_trip_keeps_colons_and_empty_payload() {
        for msg in [
            Message::delivery("lobby", "alice", "time: 12:30"),
            Message::new(Tag::Leave, ""),
            Message::new(Tag::Join, "x".repeat(MAX_LEN)),
        ] {
            assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn test_decode_strips_crlf() {
        let msg = Message::decode("join:lobby\r\n").unwrap();
        assert_eq!(msg, Message::new(Tag::Join, "lobby"));

        let msg = Message::decode("ok:").unwrap();
        assert_eq!(msg, Message::ok());
    }

    #[test]
    fn test_decode_only_first_colon_splits() {
        let msg = Message::decode("delivery:lobby:alice:a:b").unwrap();
        assert_eq!(msg.tag, Tag::Delivery);
        assert_eq!(msg.payload, "lobby:alice:a:b");
    }

    #[test]
    fn test_decode_missing_delimiter() {
        assert_eq!(
            Message::decode("sendall hello\n"),
            Err(ProtocolError::MissingDelimiter)
        );
        assert_eq!(Message::decode(""), Err(ProtocolError::MissingDelimiter));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            Message::decode("senduser:bob:hi\n"),
            Err(ProtocolError::UnknownTag("senduser".into()))
        );
        // Tags are case-sensitive
        assert!(Message::decode("OK:\n").is_err());
        assert!(Message::decode(":payload\n").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Message::new(Tag::SendAll, "x".repeat(MAX_LEN)).validate().is_ok());
        assert_eq!(
            Message::new(Tag::SendAll, "x".repeat(MAX_LEN + 1)).validate(),
            Err(ProtocolError::PayloadTooLong {
                len: MAX_LEN + 1,
                max: MAX_LEN
            })
        );
        assert_eq!(
            Message::new(Tag::SendAll, "two\nlines").validate(),
            Err(ProtocolError::EmbeddedTerminator)
        );
    }

    #[test]
    fn test_delivery_payload() {
        let msg = Message::delivery("lobby", "alice", "hi");
        assert_eq!(msg.tag, Tag::Delivery);
        assert_eq!(msg.payload, "lobby:alice:hi");
        assert_eq!(
            delivery_payload_len("lobby", "alice", "hi"),
            msg.payload.len()
        );
    }

    #[test]
    fn test_tag_display_and_parse() {
        assert_eq!(Tag::LoginPublish.to_string(), "slogin");
        assert_eq!("rlogin".parse::<Tag>().unwrap(), Tag::LoginSubscribe);
        assert!(Tag::LoginPublish.is_login());
        assert!(!Tag::Join.is_login());
    }
}
