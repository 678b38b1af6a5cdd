//! Chat server
//!
//! The listener accepts connections and spawns a [`worker::Worker`] per
//! connection. Workers share the room registry and metrics through a
//! [`worker::WorkerContext`].

pub mod config;
pub mod listener;
pub mod worker;

pub use config::ServerConfig;
pub use listener::ChatServer;
pub use worker::{Worker, WorkerContext};
