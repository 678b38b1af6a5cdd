//! Line-framed message connection
//!
//! Wraps one duplex byte stream. Each `send` writes exactly one encoded line
//! and each `receive` reads exactly one line; there is no queuing or retry
//! here, the owning task is the only one that ever touches the stream.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, ProtocolError, Result};

use super::constants::MAX_LINE_LEN;
use super::message::Message;

/// Initial read buffer capacity
const READ_BUFFER_SIZE: usize = 512;

/// Outcome of the most recent send or receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastResult {
    Success,
    EofOrError,
}

/// A message connection over a duplex byte stream
pub struct Connection<S = TcpStream> {
    /// `None` once closed
    stream: Option<S>,
    buffer: BytesMut,
    last_result: LastResult,
}

impl Connection<TcpStream> {
    /// Open a client connection to `host:port`
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;

        tracing::debug!(host = host, port = port, "Connected");
        Ok(Self::new(stream))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            last_result: LastResult::Success,
        }
    }

    /// Whether the stream has not been closed
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Result of the last send or receive
    pub fn last_result(&self) -> LastResult {
        self.last_result
    }

    /// Write one message
    ///
    /// A failed write leaves the stream open; the caller decides whether to
    /// close it.
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        let result = self.write_message(msg).await;
        self.record(&result);
        result
    }

    /// Read and decode one message
    ///
    /// End of stream, read errors and malformed lines all fail, as does a
    /// payload longer than `MAX_LEN` whatever its tag. The protocol has no way
    /// to resynchronize after a bad line.
    pub async fn receive(&mut self) -> Result<Message> {
        let result = self.read_message().await;
        self.record(&result);
        result
    }

    /// Shut down and release the stream. Calling this again does nothing.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::trace!(error = %e, "Shutdown on close failed");
            }
        }
        self.buffer.clear();
    }

    fn record<T>(&mut self, result: &Result<T>) {
        self.last_result = match result {
            Ok(_) => LastResult::Success,
            Err(_) => LastResult::EofOrError,
        };
    }

    async fn write_message(&mut self, msg: &Message) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        let line = msg.encode();

        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Message> {
        let line = self.read_line().await?;
        let line = std::str::from_utf8(&line).map_err(|_| ProtocolError::InvalidUtf8)?;

        match Message::decode(line).and_then(|msg| msg.validate().map(|()| msg)) {
            Ok(msg) => Ok(msg),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed line");
                Err(e.into())
            }
        }
    }

    /// Read up to and including the next `\n`
    async fn read_line(&mut self) -> Result<BytesMut> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                if pos + 1 > MAX_LINE_LEN {
                    self.buffer.advance(pos + 1);
                    return Err(ProtocolError::LineTooLong {
                        limit: MAX_LINE_LEN,
                    }
                    .into());
                }
                return Ok(self.buffer.split_to(pos + 1));
            }

            if self.buffer.len() >= MAX_LINE_LEN {
                self.buffer.clear();
                return Err(ProtocolError::LineTooLong {
                    limit: MAX_LINE_LEN,
                }
                .into());
            }

            let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
            self.buffer.reserve(READ_BUFFER_SIZE);
            if stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.stream.is_some())
            .field("buffered", &self.buffer.len())
            .field("last_result", &self.last_result)
            .finish()
    }
}
