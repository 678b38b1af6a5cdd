//! Chat client implementation
//!
//! Provides the two client roles:
//! - Senders log in, pick a room and broadcast text into it
//! - Receivers log in, join one room and read what is broadcast there

pub mod command;
pub mod receiver;
pub mod sender;

pub use command::{Command, CommandError};
pub use receiver::{Delivery, ReceiverClient};
pub use sender::SenderClient;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::protocol::{Connection, Message, Tag};

/// Send one request and wait for its `ok`
async fn request<S>(conn: &mut Connection<S>, msg: Message) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.send(&msg).await?;

    let reply = conn.receive().await?;
    match reply.tag {
        Tag::Ok => Ok(()),
        Tag::Err => Err(Error::Rejected(reply.payload)),
        other => Err(Error::UnexpectedReply(other)),
    }
}
