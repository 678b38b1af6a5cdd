//! Receiver (subscriber) client
//!
//! Logs in with `rlogin`, joins one room and then only reads deliveries.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::DELIMITER;
use crate::protocol::{Connection, Message, Tag};

use super::request;

/// A broadcast as seen by a receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub room: String,
    pub sender: String,
    pub text: String,
}

impl Delivery {
    /// Split a `room:sender:text` payload
    ///
    /// The text may contain colons. The server refuses room names and
    /// usernames that do, so the first two colons are always separators.
    pub fn parse(payload: &str) -> std::result::Result<Self, ProtocolError> {
        let mut parts = payload.splitn(3, DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(room), Some(sender), Some(text)) => Ok(Self {
                room: room.to_string(),
                sender: sender.to_string(),
                text: text.to_string(),
            }),
            _ => Err(ProtocolError::MalformedDelivery),
        }
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

/// Subscriber-side protocol driver
pub struct ReceiverClient<S = TcpStream> {
    conn: Connection<S>,
    username: String,
    room: String,
}

impl ReceiverClient<TcpStream> {
    /// Connect to `host:port`, log in as `username` and join `room`
    pub async fn connect(host: &str, port: u16, username: &str, room: &str) -> Result<Self> {
        let conn = Connection::connect(host, port).await?;
        Self::join(conn, username, room).await
    }
}

impl<S> ReceiverClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Log in and join over an open connection
    pub async fn join(mut conn: Connection<S>, username: &str, room: &str) -> Result<Self> {
        request(&mut conn, Message::new(Tag::LoginSubscribe, username)).await?;
        request(&mut conn, Message::new(Tag::Join, room)).await?;

        tracing::debug!(username = username, room = room, "Receiver joined");

        Ok(Self {
            conn,
            username: username.to_string(),
            room: room.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Wait for the next delivery
    ///
    /// Returns `None` when the server closes the connection. Messages other
    /// than `delivery` and `err` are skipped.
    pub async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            let msg = match self.conn.receive().await {
                Ok(msg) => msg,
                Err(Error::ConnectionClosed) => return Ok(None),
                Err(e) => return Err(e),
            };

            match msg.tag {
                Tag::Delivery => return Ok(Some(Delivery::parse(&msg.payload)?)),
                Tag::Err => return Err(Error::Rejected(msg.payload)),
                other => {
                    tracing::debug!(tag = %other, "Ignoring non-delivery message");
                }
            }
        }
    }

    /// Close the connection
    pub async fn close(mut self) {
        self.conn.close().await;
    }
}
