//! Multi-room chat broker
//!
//! Clients connect over TCP and log in as either a publisher (sender) or a
//! subscriber (receiver). Publishers pick a room and broadcast text into it;
//! subscribers join one room and receive every broadcast made there.
//!
//! Each accepted connection gets its own task. Broadcasts never wait on a
//! subscriber's socket: they are queued on a per-subscriber FIFO that the
//! subscriber's own task drains.
//!
//! # Example
//! ```no_run
//! use chat_broker::{ChatServer, ServerConfig};
//!
//! # async fn example() -> chat_broker::error::Result<()> {
//! let server = ChatServer::new(ServerConfig::with_port(5000));
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{Connection, Message, Tag};
pub use registry::{Room, RoomRegistry, Subscriber, SubscriberQueue};
pub use server::{ChatServer, ServerConfig};
