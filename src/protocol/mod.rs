//! Chat wire protocol
//!
//! One message per line: `<tag>:<payload>\n`.
//!
//! ```text
//! Publisher                 Server                  Subscriber
//!   | slogin:alice  -------->  |  <-------- rlogin:bob  |
//!   | <-------------- ok:      |  ok: -------------->   |
//!   | join:lobby    -------->  |  <-------- join:lobby  |
//!   | <-------------- ok:      |  ok: -------------->   |
//!   | sendall:hi    -------->  |                        |
//!   | <-------------- ok:      |  delivery:lobby:alice:hi ->
//! ```

pub mod connection;
pub mod constants;
pub mod message;

pub use connection::{Connection, LastResult};
pub use constants::MAX_LEN;
pub use message::{Message, Tag};
