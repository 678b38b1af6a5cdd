//! Sender (publisher) client
//!
//! Logs in with `slogin`, then issues one request at a time and waits for
//! its `ok`/`err` reply.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::protocol::{Connection, Message, Tag};

use super::command::Command;
use super::request;

/// Publisher-side protocol driver
///
/// # Example
/// ```no_run
/// use chat_broker::client::SenderClient;
///
/// # async fn example() -> chat_broker::error::Result<()> {
/// let mut sender = SenderClient::connect("localhost", 5000, "alice").await?;
/// sender.join("lobby").await?;
/// sender.send_all("hello everyone").await?;
/// sender.quit().await?;
/// # Ok(())
/// # }
/// ```
pub struct SenderClient<S = TcpStream> {
    conn: Connection<S>,
    username: String,
    room: Option<String>,
}

impl SenderClient<TcpStream> {
    /// Connect to `host:port` and log in as `username`
    pub async fn connect(host: &str, port: u16, username: &str) -> Result<Self> {
        let conn = Connection::connect(host, port).await?;
        Self::login(conn, username).await
    }
}

impl<S> SenderClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Log in as `username` over an open connection
    pub async fn login(mut conn: Connection<S>, username: &str) -> Result<Self> {
        request(&mut conn, Message::new(Tag::LoginPublish, username)).await?;

        Ok(Self {
            conn,
            username: username.to_string(),
            room: None,
        })
    }

    /// Username this client logged in with
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Room the server last confirmed joining
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Make `room` the target of subsequent broadcasts
    pub async fn join(&mut self, room: &str) -> Result<()> {
        request(&mut self.conn, Message::new(Tag::Join, room)).await?;
        self.room = Some(room.to_string());
        Ok(())
    }

    /// Broadcast `text` to the current room
    ///
    /// Text longer than the protocol limit or containing a line terminator
    /// is refused before anything is sent.
    pub async fn send_all(&mut self, text: &str) -> Result<()> {
        let msg = Message::new(Tag::SendAll, text);
        msg.validate()?;
        request(&mut self.conn, msg).await
    }

    /// Stop targeting the current room
    pub async fn leave(&mut self) -> Result<()> {
        request(&mut self.conn, Message::new(Tag::Leave, "")).await?;
        self.room = None;
        Ok(())
    }

    /// End the session and close the connection
    pub async fn quit(mut self) -> Result<()> {
        let result = request(&mut self.conn, Command::Quit.to_message()).await;
        self.conn.close().await;
        result
    }

    /// Run a parsed input command
    ///
    /// Returns `true` once the session has ended (`/quit`).
    pub async fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Join(room) => self.join(&room).await?,
            Command::Leave => self.leave().await?,
            Command::SendAll(text) => self.send_all(&text).await?,
            Command::Quit => {
                request(&mut self.conn, command.to_message()).await?;
                self.conn.close().await;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
