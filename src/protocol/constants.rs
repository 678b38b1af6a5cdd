//! Protocol constants

use std::time::Duration;

/// Maximum payload length in bytes
pub const MAX_LEN: usize = 255;

/// Longest tag symbol on the wire (`delivery`)
pub const MAX_TAG_LEN: usize = 8;

/// Longest line a connection will buffer: tag, colon, payload, CRLF
pub const MAX_LINE_LEN: usize = MAX_TAG_LEN + 1 + MAX_LEN + 2;

/// Separator between tag and payload
pub const DELIMITER: char = ':';

/// Bounded wait used by subscriber workers between queue polls
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Reply texts sent by the server
pub mod replies {
    pub const INVALID_LOGIN: &str = "Invalid login";
    pub const EXPECTED_LOGIN: &str = "Expected slogin or rlogin";
    pub const MISSING_USERNAME: &str = "Missing username";
    pub const INVALID_USERNAME: &str = "Username may not contain ':'";
    pub const EXPECTED_JOIN: &str = "Expected join";
    pub const MISSING_ROOM: &str = "Missing room name";
    pub const INVALID_ROOM: &str = "Room name may not contain ':'";
    pub const NOT_IN_ROOM: &str = "Not in a room";
    pub const INVALID_COMMAND: &str = "Invalid command";
    pub const MESSAGE_TOO_LONG: &str = "Message too long";
}
