//! Per-connection session tracking

pub mod state;

pub use state::{Role, SessionPhase, SessionState};
