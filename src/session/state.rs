//! Session state machine
//!
//! Tracks one connection from accept to close:
//!
//! ```text
//! AwaitLogin ──slogin──► PublisherLoop ──quit/EOF──┐
//!     │                                            ▼
//!     └────rlogin──► AwaitJoin ──join──► SubscriberLoop ──send fail──► Closed
//! ```
//!
//! Any failure in `AwaitLogin` or `AwaitJoin` goes straight to `Closed`.

use std::net::SocketAddr;
use std::time::Instant;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, waiting for `slogin` or `rlogin`
    AwaitLogin,
    /// Logged in as publisher, processing commands
    PublisherLoop,
    /// Logged in as subscriber, waiting for `join`
    AwaitJoin,
    /// Joined, forwarding deliveries
    SubscriberLoop,
    /// Session closed
    Closed,
}

/// Role chosen at login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sender: broadcasts into rooms
    Publisher,
    /// Receiver: gets broadcasts from one room
    Subscriber,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Publisher => f.write_str("publisher"),
            Role::Subscriber => f.write_str("subscriber"),
        }
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Role, once logged in
    pub role: Option<Role>,

    /// Username, once logged in
    pub username: Option<String>,

    /// Room name: the publisher's current room or the subscriber's joined room
    pub room: Option<String>,

    /// Connection start time
    pub connected_at: Instant,

    /// Messages received from the peer
    pub messages_received: u64,

    /// Messages written to the peer
    pub messages_sent: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::AwaitLogin,
            role: None,
            username: None,
            room: None,
            connected_at: Instant::now(),
            messages_received: 0,
            messages_sent: 0,
        }
    }

    /// Complete login; moves to the role's first phase
    pub fn on_login(&mut self, role: Role, username: impl Into<String>) {
        if self.phase != SessionPhase::AwaitLogin {
            return;
        }

        self.role = Some(role);
        self.username = Some(username.into());
        self.phase = match role {
            Role::Publisher => SessionPhase::PublisherLoop,
            Role::Subscriber => SessionPhase::AwaitJoin,
        };
    }

    /// Record a room change
    ///
    /// For a subscriber this completes the join and starts the delivery loop.
    pub fn on_join(&mut self, room: impl Into<String>) {
        match self.phase {
            SessionPhase::PublisherLoop => self.room = Some(room.into()),
            SessionPhase::AwaitJoin => {
                self.room = Some(room.into());
                self.phase = SessionPhase::SubscriberLoop;
            }
            _ => {}
        }
    }

    /// Publisher left its current room
    pub fn on_leave(&mut self) {
        if self.phase == SessionPhase::PublisherLoop {
            self.room = None;
        }
    }

    /// Close the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Username, or an empty string before login
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
